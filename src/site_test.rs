use super::*;

#[test]
fn default_service_is_first_entry() {
    assert_eq!(default_service().id, "carotaj");
    assert_eq!(default_service(), &SERVICES[0]);
}

#[test]
fn find_service_known_and_unknown() {
    assert_eq!(find_service("demolare").map(|s| s.label), Some("Demolare Controlată"));
    assert!(find_service("sapaturi").is_none());
}

#[test]
fn service_ids_are_unique() {
    for (i, a) in SERVICES.iter().enumerate() {
        assert!(SERVICES[i + 1..].iter().all(|b| b.id != a.id), "duplicate id {}", a.id);
    }
}

#[test]
fn system_instruction_sets_persona_rules() {
    assert!(SYSTEM_INSTRUCTION.contains(COMPANY_NAME));
    assert!(SYSTEM_INSTRUCTION.contains(PHONE_NUMBER));
    assert!(SYSTEM_INSTRUCTION.contains("limba Română"));
    assert!(SYSTEM_INSTRUCTION.contains("Nu inventa prețuri"));
    assert!(SYSTEM_INSTRUCTION.contains("110-160mm"));
}

#[test]
fn system_instruction_keeps_prompt_file_layout() {
    assert!(SYSTEM_INSTRUCTION.starts_with("Ești un asistent virtual expert"));
    assert!(SYSTEM_INSTRUCTION.ends_with('\n'));
    assert!(SYSTEM_INSTRUCTION.contains("\nExemple de răspunsuri:\n"));
    assert!(SYSTEM_INSTRUCTION.lines().any(|l| l.starts_with("- Întrebare: \"Tăiați perete de beton armat?\"")));
}
