use taskdesk::output::{format_human, format_table, HumanOutput};

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("taskdesk login: signed in as ops@example.com");
    human.push_summary("session", "/tmp/taskdesk/session.json");
    human.push_detail("expires in 1h");
    human.push_warning("session lookup failed: Transport error: timeout");
    human.push_next_step("taskdesk list");

    let rendered = format_human(&human);
    assert!(rendered.contains("taskdesk login: signed in as ops@example.com"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- session: /tmp/taskdesk/session.json"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- expires in 1h"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- taskdesk list"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("taskdesk logout: no session");
    let rendered = format_human(&human);
    assert_eq!(rendered, "taskdesk logout: no session");
}

#[test]
fn body_sits_between_header_and_sections() {
    let headers = vec!["ID".to_string(), "Project".to_string()];
    let rows = vec![vec!["7".to_string(), "Atlas".to_string()]];
    let mut human = HumanOutput::new("Showing all records (1 record)");
    human.set_body(format_table(&headers, &rows, 28));
    human.push_next_step("taskdesk edit <id> --set field=value");

    let rendered = format_human(&human);
    let table_at = rendered.find("ID  Project").expect("table header");
    let steps_at = rendered.find("Next steps:").expect("next steps");
    assert!(table_at < steps_at);
    assert!(rendered.contains("7   Atlas"));
}
