use crate::template::grid::LabeledGrid;

/// Column holding the row labels.
pub const LABEL_COLUMN: u16 = 1;

/// Finds the first row of `sheet` whose label cell contains any of
/// `keywords`, ignoring case. Rows are scanned top to bottom and the first
/// matching row wins regardless of which keyword matched.
pub fn find_label_row<G>(grid: &G, sheet: usize, keywords: &[String]) -> Option<u32>
where
    G: LabeledGrid + ?Sized,
{
    let keywords: Vec<String> = keywords
        .iter()
        .map(|keyword| keyword.to_uppercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    if keywords.is_empty() {
        return None;
    }

    (1..=grid.last_row(sheet)).find(|row| {
        grid.cell_text(sheet, *row, LABEL_COLUMN)
            .map(|label| label.to_uppercase())
            .is_some_and(|label| keywords.iter().any(|keyword| label.contains(keyword)))
    })
}
