use crate::changes::ChangeTable;

/// Renders a markdown digest of the declared changes, one section per file.
///
/// Variables changed without a rename are listed under `Harmonised`, renamed
/// ones as `old -> new` pairs under `Renamed`.
pub fn summarise_changes(changes: &ChangeTable) -> String {
    let changed = changes.changed();
    let mut lines = Vec::new();

    for file in changed.files() {
        lines.push(format!("## {file}"));

        let harmonised: Vec<&str> = changed
            .for_file(file)
            .filter(|row| row.new_var_name.is_none())
            .map(|row| row.old_var_name.as_str())
            .collect();
        if !harmonised.is_empty() {
            lines.push("### Harmonised".to_string());
            lines.push(harmonised.join(", "));
        }

        let renamed: Vec<String> = changed
            .for_file(file)
            .filter_map(|row| {
                row.new_var_name
                    .as_ref()
                    .map(|new| format!("{} -> {new}", row.old_var_name))
            })
            .collect();
        if !renamed.is_empty() {
            lines.push("### Renamed".to_string());
            lines.push(renamed.join(", "));
        }

        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeRow;

    #[test]
    fn groups_changes_under_sorted_file_headings() {
        let table = ChangeTable::new(vec![
            ChangeRow::new("wave2.sav", "Q1").rename_to("gender"),
            ChangeRow::new("wave1.sav", "Q2").recode("{1: 0}"),
            ChangeRow::new("wave1.sav", "Q3").relabel("Age"),
            ChangeRow::new("wave1.sav", "Q4").rename_to("region"),
            ChangeRow::new("wave3.sav", "Q5"),
        ]);

        let expected = [
            "## wave1.sav",
            "### Harmonised",
            "Q2, Q3",
            "### Renamed",
            "Q4 -> region",
            "",
            "## wave2.sav",
            "### Renamed",
            "Q1 -> gender",
            "",
        ]
        .join("\n");

        assert_eq!(summarise_changes(&table), expected);
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(summarise_changes(&ChangeTable::default()), "");
    }
}
