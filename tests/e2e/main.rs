mod full_system_tests;
mod medical_diagnosis_test;
