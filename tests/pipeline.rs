use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use pier_takeoff::ToolError;
use pier_takeoff::diagnostics::{Advisory, Diagnostics};
use pier_takeoff::io::{excel_read, excel_write, template_book};
use pier_takeoff::model::ConditionKey;
use pier_takeoff::pipeline;
use pier_takeoff::template::{LabeledGrid, MacroPolicy, TemplateLayout};
use rust_xlsxwriter::{Format, Formula, Workbook};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const VBA_PROJECT_PART: &str = "xl/vbaProject.bin";
const VBA_PROJECT: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const HEADERS: [&str; 8] = [
    "Classification Folder",
    "Classification",
    "Quantity 1",
    "Quantity1 UOM",
    "Height",
    "Height UOM",
    "Width",
    "Width UOM",
];

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

fn write_export(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (column, header) in headers.iter().enumerate() {
        worksheet.write_string(0, column as u16, *header).unwrap();
    }
    for (row_idx, row) in rows.iter().enumerate() {
        let row_number = (row_idx + 1) as u32;
        for (column, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string(row_number, column as u16, *value).unwrap();
                }
                Cell::Number(value) => {
                    worksheet.write_number(row_number, column as u16, *value).unwrap();
                }
                Cell::Blank => {}
            }
        }
    }
    workbook.save(path).unwrap();
}

fn write_template(path: &Path) {
    let mut workbook = Workbook::new();

    let bid = workbook.add_worksheet();
    bid.set_name("BID").unwrap();
    bid.write_string(0, 0, "Drilled Pier Estimate").unwrap();
    bid.write_string(11, 0, "Shaft Dia inches").unwrap();
    bid.write_string(12, 0, "Bell Dia inches").unwrap();
    bid.write_string(13, 0, "Pier Depth LF").unwrap();
    bid.write_string(14, 0, "Pier Qty").unwrap();
    bid.write_string(28, 0, "Total Length LF Piers").unwrap();
    bid.write_formula(28, 2, Formula::new("=C14*C15")).unwrap();

    let summary = workbook.add_worksheet();
    summary.set_name("Summary").unwrap();
    summary.write_formula(0, 0, Formula::new("=BID!C29")).unwrap();

    workbook.save(path).unwrap();
}

/// Template carrying formatting, a merged title, a wide label column, a
/// defined name, a date and a shared formula across the count row.
fn write_formatted_template(path: &Path) {
    let staging = path.with_extension("staging.xlsx");
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let date = Format::new().set_num_format("yyyy-mm-dd");

    let bid = workbook.add_worksheet();
    bid.set_name("BID").unwrap();
    bid.set_column_width(0, 40).unwrap();
    bid.write_string_with_format(0, 0, "Drilled Pier Estimate", &bold)
        .unwrap();
    bid.write_number_with_format(0, 1, 45352.0, &date).unwrap();
    bid.merge_range(2, 0, 2, 3, "Bid Date", &bold).unwrap();
    bid.write_string(11, 0, "Shaft Dia inches").unwrap();
    bid.write_string(12, 0, "Bell Dia inches").unwrap();
    bid.write_string(13, 0, "Pier Depth LF").unwrap();
    bid.write_string(14, 0, "Pier Qty").unwrap();
    bid.write_formula(14, 2, Formula::new("=C14*2")).unwrap();
    bid.write_formula(14, 3, Formula::new("=D14*2")).unwrap();
    bid.write_string(28, 0, "Total Length LF Piers").unwrap();
    bid.write_formula(28, 2, Formula::new("=C14*C15")).unwrap();
    workbook.define_name("BidDate", "=BID!$B$1").unwrap();
    workbook.save(&staging).unwrap();

    rewrite_archive(&staging, path, &[], |name, contents| {
        if name != "xl/worksheets/sheet1.xml" {
            return contents;
        }
        let xml = String::from_utf8(contents).unwrap();
        assert!(xml.contains("<f>C14*2</f>") && xml.contains("<f>D14*2</f>"));
        xml.replace("<f>C14*2</f>", r#"<f t="shared" ref="C15:D15" si="0">C14*2</f>"#)
            .replace("<f>D14*2</f>", r#"<f t="shared" si="0"/>"#)
            .into_bytes()
    });
}

/// Turns a plain workbook into a macro-enabled one carrying `VBA_PROJECT`.
fn add_vba_project(source: &Path, target: &Path) {
    let extra = [(VBA_PROJECT_PART, VBA_PROJECT.as_slice())];
    rewrite_archive(source, target, &extra, |name, contents| {
        let xml = String::from_utf8_lossy(&contents).into_owned();
        let patched = match name {
            "[Content_Types].xml" => xml
                .replace(
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
                    "application/vnd.ms-excel.sheet.macroEnabled.main+xml",
                )
                .replace(
                    "</Types>",
                    r#"<Default Extension="bin" ContentType="application/vnd.ms-office.vbaProject"/></Types>"#,
                ),
            "xl/_rels/workbook.xml.rels" => xml.replace(
                "</Relationships>",
                r#"<Relationship Id="rId99" Type="http://schemas.microsoft.com/office/2006/relationships/vbaProject" Target="vbaProject.bin"/></Relationships>"#,
            ),
            _ => return contents,
        };
        patched.into_bytes()
    });
}

fn rewrite_archive(
    source: &Path,
    target: &Path,
    extra: &[(&str, &[u8])],
    edit: impl Fn(&str, Vec<u8>) -> Vec<u8>,
) {
    let mut archive = ZipArchive::new(File::open(source).unwrap()).unwrap();
    let mut writer = ZipWriter::new(File::create(target).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).unwrap();
        let name = entry.name().to_string();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(&edit(&name, contents)).unwrap();
    }
    for (name, contents) in extra {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
}

fn archive_part(path: &Path, name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).unwrap();
    Some(contents)
}

/// Worksheet parts of the archive whose XML contains `needle`.
fn worksheet_parts_containing(path: &Path, needle: &str) -> usize {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/sheet"))
        .map(str::to_string)
        .collect();
    names
        .iter()
        .filter_map(|name| archive_part(path, name))
        .filter(|xml| String::from_utf8_lossy(xml).contains(needle))
        .count()
}

fn pier_rows() -> Vec<Vec<Cell<'static>>> {
    vec![
        vec![
            Cell::Text("Drilled Piers"),
            Cell::Text("PIER - 1"),
            Cell::Number(3.0),
            Cell::Text("EA"),
            Cell::Number(10.0),
            Cell::Text("FT"),
            Cell::Number(2.0),
            Cell::Text("FT"),
        ],
        vec![
            Cell::Text("Footings"),
            Cell::Text("F-1"),
            Cell::Number(8.0),
            Cell::Text("EA"),
            Cell::Blank,
            Cell::Blank,
            Cell::Blank,
            Cell::Blank,
        ],
        vec![
            Cell::Text("Drilled Piers"),
            Cell::Text("PC - 1"),
            Cell::Number(2.0),
            Cell::Blank,
            Cell::Blank,
            Cell::Blank,
            Cell::Number(30.0),
            Cell::Text("IN"),
        ],
    ]
}

#[test]
fn takeoff_export_is_aggregated() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    write_export(&export_path, &HEADERS, &pier_rows());

    let summary = pipeline::summarize_takeoff(&export_path).expect("takeoff summarized");

    assert!(summary.advisories.is_empty());
    assert_eq!(summary.metrics.len(), 2);
    let pier = &summary.metrics[&ConditionKey::new("UNASSIGNED", "PIER - 1")];
    assert_eq!(pier.shaft_diameter_in, Some(24.0));
    assert_eq!(pier.bell_diameter_in, Some(24.0));
    assert_eq!(pier.depth_ft, Some(10.0));
    assert_eq!(pier.count, 3.0);
    assert_eq!(pier.total_length_ft, Some(30.0));

    let classifications: Vec<&str> = summary
        .sorted_metrics()
        .into_iter()
        .map(|metrics| metrics.classification.as_str())
        .collect();
    assert_eq!(classifications, vec!["PC - 1", "PIER - 1"]);
}

#[test]
fn missing_key_columns_are_reported() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    write_export(
        &export_path,
        &["Classification", "Quantity 1"],
        &[vec![Cell::Text("PIER - 1"), Cell::Number(2.0)]],
    );

    let mut diagnostics = Diagnostics::new();
    let export = excel_read::read_takeoff(&export_path, &mut diagnostics).expect("export read");

    assert_eq!(export.records.len(), 1);
    assert_eq!(
        diagnostics.advisories(),
        &[Advisory::MissingColumn {
            column: "Classification Folder".to_string()
        }]
    );
}

#[test]
fn missing_input_is_fatal() {
    let temp_dir = tempdir().expect("temporary directory");
    let missing = temp_dir.path().join("nope.xlsx");

    let error = pipeline::summarize_takeoff(&missing).expect_err("missing input rejected");

    assert!(matches!(error, ToolError::MissingInput(path) if path == missing));
}

#[test]
fn estimate_is_written_with_cloned_tier_sheets() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    let template_path = temp_dir.path().join("template.xlsx");
    let output_path = temp_dir.path().join("estimate.xlsx");
    write_export(&export_path, &HEADERS, &pier_rows());
    write_template(&template_path);

    let report = pipeline::populate_estimate(
        &export_path,
        &template_path,
        &output_path,
        &TemplateLayout::default(),
    )
    .expect("estimate populated");

    assert!(!report.macros_kept);
    assert!(report.advisories.is_empty());
    assert_eq!(report.population.conditions_written, 1);
    assert_eq!(
        report.population.sheets.get("UNASSIGNED").map(String::as_str),
        Some("UNASSIGNED")
    );

    let mut workbook: Xlsx<_> = open_workbook(&output_path).expect("output opened");
    assert_eq!(
        workbook.sheet_names().to_vec(),
        vec!["BID".to_string(), "Summary".to_string(), "UNASSIGNED".to_string()]
    );

    let tier = workbook
        .worksheet_range("UNASSIGNED")
        .expect("tier sheet present")
        .expect("tier sheet readable");
    assert_eq!(
        tier.get_value((4, 2)),
        Some(&DataType::String("PIER - 1".to_string()))
    );
    assert_eq!(tier.get_value((11, 2)), Some(&DataType::Float(24.0)));
    assert_eq!(tier.get_value((12, 2)), Some(&DataType::Float(24.0)));
    assert_eq!(tier.get_value((13, 2)), Some(&DataType::Float(10.0)));
    assert_eq!(tier.get_value((14, 2)), Some(&DataType::Float(3.0)));

    let tier_formulas = workbook
        .worksheet_formula("UNASSIGNED")
        .expect("tier formulas present")
        .expect("tier formulas readable");
    assert_eq!(tier_formulas.get_value((28, 2)).map(String::as_str), Some("C14*C15"));

    let bid = workbook
        .worksheet_range("BID")
        .expect("template sheet present")
        .expect("template sheet readable");
    assert!(matches!(bid.get_value((4, 2)), None | Some(DataType::Empty)));
    assert!(matches!(bid.get_value((11, 2)), None | Some(DataType::Empty)));

    let summary_formulas = workbook
        .worksheet_formula("Summary")
        .expect("summary formulas present")
        .expect("summary formulas readable");
    assert_eq!(summary_formulas.get_value((0, 0)).map(String::as_str), Some("BID!C29"));
}

#[test]
fn estimate_without_piers_copies_the_template() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    let template_path = temp_dir.path().join("template.xlsx");
    let output_path = temp_dir.path().join("estimate.xlsx");
    write_export(&export_path, &HEADERS, &[pier_rows().remove(1)]);
    write_template(&template_path);

    let report = pipeline::populate_estimate(
        &export_path,
        &template_path,
        &output_path,
        &TemplateLayout::default(),
    )
    .expect("estimate populated");

    assert!(report.population.sheets.is_empty());
    let workbook: Xlsx<_> = open_workbook(&output_path).expect("output opened");
    assert_eq!(
        workbook.sheet_names().to_vec(),
        vec!["BID".to_string(), "Summary".to_string()]
    );
}

#[test]
fn metrics_json_is_sorted_by_condition() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    let json_path = temp_dir.path().join("metrics.json");
    write_export(&export_path, &HEADERS, &pier_rows());

    let summary = pipeline::summarize_takeoff(&export_path).expect("takeoff summarized");
    pipeline::write_metrics_json(&json_path, &summary.metrics).expect("metrics written");

    let written = fs::read_to_string(&json_path).expect("JSON read");
    let parsed: serde_json::Value = serde_json::from_str(&written).expect("JSON parsed");
    let entries = parsed.as_array().expect("array of metrics");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["classification"], "PC - 1");
    assert_eq!(entries[0]["shaft_diameter_in"], 30.0);
    assert_eq!(entries[1]["total_length_ft"], 30.0);
}

#[test]
fn metrics_workbook_holds_one_row_per_condition() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    let workbook_path = temp_dir.path().join("metrics.xlsx");
    write_export(&export_path, &HEADERS, &pier_rows());

    let summary = pipeline::summarize_takeoff(&export_path).expect("takeoff summarized");
    pipeline::write_metrics_workbook(&workbook_path, &summary.metrics).expect("metrics written");

    let mut workbook: Xlsx<_> = open_workbook(&workbook_path).expect("metrics opened");
    let table = workbook
        .worksheet_range(excel_write::METRICS_SHEET)
        .expect("metrics sheet present")
        .expect("metrics sheet readable");
    assert_eq!(table.height(), 3);
    assert_eq!(table.get_value((0, 1)), Some(&DataType::String("Classification".into())));
    assert_eq!(table.get_value((1, 1)), Some(&DataType::String("PC - 1".into())));
    assert_eq!(table.get_value((1, 2)), Some(&DataType::Float(30.0)));
    assert!(matches!(table.get_value((1, 4)), None | Some(DataType::Empty)));
    assert_eq!(table.get_value((2, 5)), Some(&DataType::Float(3.0)));
    assert_eq!(table.get_value((2, 6)), Some(&DataType::Float(30.0)));
}

#[test]
fn macro_template_keeps_vba_project_in_macro_output() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    let plain_path = temp_dir.path().join("plain.xlsx");
    let template_path = temp_dir.path().join("template.xlsm");
    let output_path = temp_dir.path().join("estimate.xlsm");
    write_export(&export_path, &HEADERS, &pier_rows());
    write_template(&plain_path);
    add_vba_project(&plain_path, &template_path);

    let report = pipeline::populate_estimate(
        &export_path,
        &template_path,
        &output_path,
        &TemplateLayout::default(),
    )
    .expect("estimate populated");

    assert!(report.macros_kept);
    assert_eq!(
        archive_part(&output_path, VBA_PROJECT_PART),
        Some(VBA_PROJECT.to_vec())
    );
    let reloaded =
        template_book::read_template(&output_path, MacroPolicy::Keep).expect("output reloaded");
    assert!(reloaded.has_macros());
    assert_eq!(
        reloaded.sheet_titles(),
        vec!["BID".to_string(), "Summary".to_string(), "UNASSIGNED".to_string()]
    );
}

#[test]
fn macro_template_saved_as_plain_workbook_drops_vba_project() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    let plain_path = temp_dir.path().join("plain.xlsx");
    let template_path = temp_dir.path().join("template.xlsm");
    let output_path = temp_dir.path().join("estimate.xlsx");
    write_export(&export_path, &HEADERS, &pier_rows());
    write_template(&plain_path);
    add_vba_project(&plain_path, &template_path);

    let report = pipeline::populate_estimate(
        &export_path,
        &template_path,
        &output_path,
        &TemplateLayout::default(),
    )
    .expect("estimate populated");

    assert!(!report.macros_kept);
    assert_eq!(archive_part(&output_path, VBA_PROJECT_PART), None);
    let workbook: Xlsx<_> = open_workbook(&output_path).expect("output opened");
    assert_eq!(workbook.sheet_names().len(), 3);
}

#[test]
fn template_formatting_survives_population() {
    let temp_dir = tempdir().expect("temporary directory");
    let export_path = temp_dir.path().join("takeoff.xlsx");
    let template_path = temp_dir.path().join("template.xlsx");
    let output_path = temp_dir.path().join("estimate.xlsx");
    let mut rows = pier_rows();
    rows.push(vec![
        Cell::Text("Drilled Piers"),
        Cell::Text("PIER - 2"),
        Cell::Number(4.0),
        Cell::Text("EA"),
        Cell::Number(12.0),
        Cell::Text("FT"),
        Cell::Number(36.0),
        Cell::Text("IN"),
    ]);
    write_export(&export_path, &HEADERS, &rows);
    write_formatted_template(&template_path);

    let report = pipeline::populate_estimate(
        &export_path,
        &template_path,
        &output_path,
        &TemplateLayout::default(),
    )
    .expect("estimate populated");

    assert_eq!(report.population.conditions_written, 2);
    let skipped: Vec<(u32, u16)> = report
        .advisories
        .iter()
        .filter_map(|advisory| match advisory {
            Advisory::FormulaCellSkipped { row, column, .. } => Some((*row, *column)),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![(15, 3), (15, 4)]);

    let report_json = serde_json::to_value(&report).expect("report serialized");
    assert_eq!(report_json["macros_kept"], false);
    assert_eq!(report_json["population"]["sheets"]["UNASSIGNED"], "UNASSIGNED");
    assert_eq!(report_json["population"]["cells_written"], 6);
    assert_eq!(report_json["advisories"][0]["kind"], "formula_cell_skipped");
    assert_eq!(report_json["advisories"][0]["row"], 15);

    let mut workbook: Xlsx<_> = open_workbook(&output_path).expect("output opened");
    for sheet in ["BID", "UNASSIGNED"] {
        let values = workbook
            .worksheet_range(sheet)
            .expect("sheet present")
            .expect("sheet readable");
        assert_eq!(values.get_value((0, 1)), Some(&DataType::DateTime(45352.0)));
    }
    let tier = workbook
        .worksheet_range("UNASSIGNED")
        .expect("tier sheet present")
        .expect("tier sheet readable");
    assert_eq!(tier.get_value((11, 2)), Some(&DataType::Float(24.0)));
    assert_eq!(tier.get_value((11, 3)), Some(&DataType::Float(36.0)));
    assert_eq!(tier.get_value((13, 3)), Some(&DataType::Float(12.0)));

    let reloaded =
        template_book::read_template(&output_path, MacroPolicy::Drop).expect("output reloaded");
    for sheet in [0, 1] {
        assert!(reloaded.holds_formula(sheet, 15, 3));
        assert!(reloaded.holds_formula(sheet, 15, 4));
        assert!(reloaded.holds_formula(sheet, 29, 3));
    }

    assert_eq!(worksheet_parts_containing(&output_path, r#"ref="A3:D3""#), 2);
    assert_eq!(worksheet_parts_containing(&output_path, "customWidth"), 2);
    let workbook_xml = archive_part(&output_path, "xl/workbook.xml").expect("workbook part");
    assert!(String::from_utf8_lossy(&workbook_xml).contains("BidDate"));
    let styles_xml = archive_part(&output_path, "xl/styles.xml").expect("styles part");
    let styles_xml = String::from_utf8_lossy(&styles_xml);
    assert!(styles_xml.contains("<b/>") || styles_xml.contains(r#"<b val="1"/>"#));
}
