//! A small clinic knowledge base built and queried entirely from scripts

use logicbox_tests::common::{run_script, test_service};
use pretty_assertions::assert_eq;
use serde_json::json;

const CLINIC: &str = r#"kb = FolKB()
kb.tell(expr("Fever(Ahmad)"))
kb.tell(expr("Cough(Ahmad)"))
kb.tell(expr("SoreThroat(Ahmad)"))

kb.tell(expr("Fatigue(Fatima)"))
kb.tell(expr("Rash(Fatima)"))
kb.tell(expr("JointPain(Fatima)"))

kb.tell(expr("ShortnessOfBreath(Leila)"))
kb.tell(expr("ChestPain(Leila)"))
kb.tell(expr("Cough(Leila)"))

kb.tell(expr("Headache(Omar)"))
kb.tell(expr("Fever(Omar)"))
kb.tell(expr("Fatigue(Omar)"))

kb.tell(expr("Nausea(Youssef)"))
kb.tell(expr("Vomiting(Youssef)"))
kb.tell(expr("AbdominalPain(Youssef)"))

kb.tell(expr("Fever(x) & Cough(x) ==> HasFlu(x)"))
kb.tell(expr("Fever(x) & Cough(x) & SoreThroat(x) ==> HasStrepThroat(x)"))
kb.tell(expr("ShortnessOfBreath(x) & ChestPain(x) ==> HasPneumonia(x)"))
kb.tell(expr("Rash(x) & JointPain(x) ==> HasLymeDisease(x)"))
kb.tell(expr("Nausea(x) & Vomiting(x) ==> HasGastroenteritis(x)"))
kb.tell(expr("Headache(x) & Fever(x) ==> HasMeningitis(x)"))
kb.tell(expr("Fatigue(x) & Fever(x) ==> HasMononucleosis(x)"))
kb.tell(expr("Cough(x) & ShortnessOfBreath(x) ==> HasBronchitis(x)"))
conditions = ["HasFlu", "HasStrepThroat", "HasPneumonia", "HasLymeDisease", "HasGastroenteritis", "HasMeningitis", "HasMononucleosis", "HasBronchitis"]
"#;

fn script(trailing: &str) -> String {
    format!("{}{}", CLINIC, trailing)
}

#[tokio::test]
async fn test_forward_chaining_diagnoses_every_patient() {
    let response = run_script(
        &test_service(),
        &script("sorted([str(m['x']) + ' likely has ' + c[3:] for c in conditions for m in fol_fc_ask(kb, expr(c + '(x)'))])"),
    )
    .await;
    assert_eq!(
        response.result(),
        Some(&json!([
            "Ahmad likely has Flu",
            "Ahmad likely has StrepThroat",
            "Fatima likely has LymeDisease",
            "Leila likely has Bronchitis",
            "Leila likely has Pneumonia",
            "Omar likely has Meningitis",
            "Omar likely has Mononucleosis",
            "Youssef likely has Gastroenteritis",
        ]))
    );
}

#[tokio::test]
async fn test_backward_chaining_verifies_diagnoses() {
    let response = run_script(
        &test_service(),
        &script("[len(fol_bc_ask(kb, expr(q))) > 0 for q in ['HasStrepThroat(Ahmad)', 'HasPneumonia(Leila)', 'HasFlu(Omar)', 'HasMeningitis(Youssef)']]"),
    )
    .await;
    assert_eq!(response.result(), Some(&json!([true, true, false, false])));
}

#[tokio::test]
async fn test_report_printed_to_stdout() {
    let trailing = "lines = [print(str(m['x']) + ' likely has ' + c[3:]) for c in conditions for m in fol_fc_ask(kb, expr(c + '(x)'))]\nlen(lines)";
    let response = run_script(&test_service(), &script(trailing)).await;
    assert_eq!(response.result(), Some(&json!(8)));
    assert!(response.stdout().contains("Leila likely has Pneumonia\n"));
    assert_eq!(response.stdout().lines().count(), 8);
}

#[tokio::test]
async fn test_knowledge_base_clauses_are_inspectable() {
    let response = run_script(&test_service(), &script("len(kb.clauses)")).await;
    assert_eq!(response.result(), Some(&json!(23)));
}
