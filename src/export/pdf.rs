// ABOUTME: Single-page A4 PDF writer for a sick-leave report using lopdf
// ABOUTME: Base-14 Helvetica carries the English field variants; output is uncompressed and deterministic

use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};

use super::{ExportError, ReportPayload};

const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN: f32 = 56.0;
const ROW_H: f32 = 22.0;
const HEADER_RGB: (f32, f32, f32) = (73.0 / 255.0, 70.0 / 255.0, 229.0 / 255.0);

/// The base-14 fonts are used without an embedded encoding, so only printable ASCII survives.
fn latin(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

struct Page {
    ops: Vec<Operation>,
}

impl Page {
    fn new() -> Self {
        Self { ops: Vec::new() }
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), size.into()],
        ));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops
            .push(Operation::new("Tj", vec![Object::string_literal(latin(text))]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn fill_color(&mut self, (r, g, b): (f32, f32, f32)) {
        self.ops
            .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: bool) {
        self.ops
            .push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new(if fill { "f" } else { "S" }, vec![]));
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        self.ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn grid(&mut self, top: f32, rows: &[(&str, String)]) -> f32 {
        let width = PAGE_W - 2.0 * MARGIN;
        let split = MARGIN + width * 0.35;

        self.fill_color(HEADER_RGB);
        self.rect(MARGIN, top - ROW_H, width, ROW_H, true);
        self.fill_color((1.0, 1.0, 1.0));
        self.text("F2", 10.0, MARGIN + 6.0, top - ROW_H + 7.0, "Field");
        self.text("F2", 10.0, split + 6.0, top - ROW_H + 7.0, "Value");
        self.fill_color((0.0, 0.0, 0.0));

        let mut y = top - ROW_H;
        for (label, value) in rows {
            self.rect(MARGIN, y - ROW_H, width, ROW_H, false);
            self.line(split, y, split, y - ROW_H);
            self.text("F1", 10.0, MARGIN + 6.0, y - ROW_H + 7.0, label);
            self.text("F1", 10.0, split + 6.0, y - ROW_H + 7.0, value);
            y -= ROW_H;
        }
        y
    }
}

fn layout(payload: &ReportPayload) -> Page {
    let mut page = Page::new();
    let title = "Sick Leave Report";
    page.text("F2", 18.0, (PAGE_W - title.len() as f32 * 9.5) / 2.0, 790.0, title);

    let lines = [
        format!("Patient name: {}", payload.name_en),
        format!("ID number: {}", payload.id_number),
        format!("Service code: {}", payload.service_code),
        String::new(),
        format!(
            "Entry date: {} ({})",
            payload.entry_date_gregorian, payload.entry_date_hijri
        ),
        format!(
            "Exit date: {} ({})",
            payload.exit_date_gregorian, payload.exit_date_hijri
        ),
        format!("Days of stay: {}", payload.days_count),
    ];
    let mut y = 740.0;
    for line in &lines {
        if !line.is_empty() {
            page.text("F1", 12.0, MARGIN, y, line);
        }
        y -= 20.0;
    }

    let rows = [
        ("Nationality", payload.nationality_en.clone()),
        ("Physician", payload.doctor_name_en.clone()),
        ("Job title", payload.job_title_en.clone()),
        ("Facility", payload.hospital_name_en.clone()),
        ("Report issue date", payload.report_issue_date.clone()),
    ];
    let bottom = page.grid(y - 10.0, &rows);

    let dots = "................................";
    page.text("F1", 12.0, MARGIN, bottom - 40.0, "Physician signature:");
    page.text("F1", 12.0, MARGIN + 140.0, bottom - 40.0, dots);
    page.text("F1", 12.0, MARGIN, bottom - 70.0, "Facility stamp:");
    page.text("F1", 12.0, MARGIN + 140.0, bottom - 70.0, dots);

    let footer = format!("Printed: {} - {}", payload.print_date, payload.print_time);
    let footer_x = PAGE_W - MARGIN - footer.len() as f32 * 4.2;
    page.text("F1", 8.0, footer_x.max(MARGIN), 28.0, &footer);

    page
}

pub fn render(payload: &ReportPayload) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let content = Content {
        operations: layout(payload).ops,
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_W.into(), PAGE_H.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
