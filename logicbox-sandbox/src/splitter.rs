//! Splits a submitted script into preparatory lines and one trailing expression

/// One non-blank script line, trimmed, with its original 1-based number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

/// A script ready for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitScript {
    /// Lines run as statements, in order
    pub preparatory: Vec<SourceLine>,
    /// Line whose value is the result
    pub trailing: SourceLine,
}

impl SplitScript {
    pub fn lines(&self) -> impl Iterator<Item = &SourceLine> {
        self.preparatory.iter().chain(std::iter::once(&self.trailing))
    }
}

/// Split `script`.
///
/// Text without a newline or `;` is a single trimmed expression. Otherwise the
/// text is split on newlines, each line is trimmed, blank lines are dropped and
/// the last remaining line becomes the trailing expression. A `;` inside a
/// single line stays on that line.
pub fn split(script: &str) -> SplitScript {
    if !script.contains('\n') && !script.contains(';') {
        return SplitScript {
            preparatory: Vec::new(),
            trailing: SourceLine {
                number: 1,
                text: script.trim().to_string(),
            },
        };
    }

    let mut lines: Vec<SourceLine> = script
        .split('\n')
        .enumerate()
        .map(|(index, text)| SourceLine {
            number: index + 1,
            text: text.trim().to_string(),
        })
        .filter(|line| !line.text.is_empty())
        .collect();

    let trailing = lines.pop().unwrap_or(SourceLine {
        number: 1,
        text: String::new(),
    });
    SplitScript {
        preparatory: lines,
        trailing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(script: &SplitScript) -> (Vec<&str>, &str) {
        (
            script.preparatory.iter().map(|l| l.text.as_str()).collect(),
            script.trailing.text.as_str(),
        )
    }

    #[test]
    fn test_single_expression_is_trimmed() {
        let script = split("  1 + 1  ");
        assert_eq!(texts(&script), (vec![], "1 + 1"));
        assert_eq!(script.trailing.number, 1);
    }

    #[test]
    fn test_multiline_drops_blanks_and_keeps_numbers() {
        let script = split("x = 1\n\n   y = x + 1   \n\ny\n");
        assert_eq!(texts(&script), (vec!["x = 1", "y = x + 1"], "y"));
        let numbers: Vec<usize> = script.lines().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 3, 5]);
    }

    #[test]
    fn test_semicolon_line_stays_whole() {
        let script = split("a = 1; a");
        assert_eq!(texts(&script), (vec![], "a = 1; a"));

        let script = split("a = 1; b = 2\na + b");
        assert_eq!(texts(&script), (vec!["a = 1; b = 2"], "a + b"));
    }

    #[test]
    fn test_crlf_and_blank_only_scripts() {
        let script = split("x = 2\r\nx * 3\r\n");
        assert_eq!(texts(&script), (vec!["x = 2"], "x * 3"));
        assert_eq!(texts(&split("\n  \n")), (vec![], ""));
    }
}
