/// Turns a label into something safe to use as a file stem.
pub fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() {
        "unnamed".to_owned()
    } else {
        stem
    }
}

/// Receptor-qualified name of an edge group.
pub fn edge_group_name(source: &str, target: &str, receptor_type: &str) -> String {
    format!("{}__{}__{}", source, target, receptor_type)
}
