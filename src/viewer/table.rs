use poverty_chart::{Dataset, SchemaShape, AGE_GROUP_COLUMN, REFORM_COLUMN, YEAR_COLUMN};

/// Formats the raw dataset as a text table.
///
/// Years are written as plain integers, numbers with 4 decimals, and missing
/// values are left blank.
pub fn render_table(dataset: &Dataset) -> String {
    let with_reform = dataset.shape() == SchemaShape::Partition;

    let mut header: Vec<String> = vec![YEAR_COLUMN.to_string(), AGE_GROUP_COLUMN.to_string()];
    if with_reform {
        header.push(REFORM_COLUMN.to_string());
    }
    header.extend(dataset.columns().iter().cloned());
    // Text columns are left-aligned, numbers right-aligned.
    let num_text_cols = if with_reform { 3 } else { 2 };

    let rows: Vec<Vec<String>> = dataset
        .records()
        .iter()
        .map(|r| {
            let mut row = vec![format!("{}", r.year), r.age_group.label().to_string()];
            if with_reform {
                row.push(r.reform.clone().unwrap_or_default());
            }
            for col in dataset.columns() {
                row.push(r.field(col).map(|x| format!("{:.4}", x)).unwrap_or_default());
            }
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|idx| {
            rows.iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(header[idx].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| -> String {
        let parts: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                if idx < num_text_cols {
                    format!("{:<width$}", c, width = widths[idx])
                } else {
                    format!("{:>width$}", c, width = widths[idx])
                }
            })
            .collect();
        parts.join(" | ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(&header));
    out.push('\n');
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&separator.join("-+-"));
    out.push('\n');
    for row in rows.iter() {
        out.push_str(&format_line(row));
        out.push('\n');
    }
    out
}
