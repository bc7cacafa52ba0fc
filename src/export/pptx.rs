// ABOUTME: Three-slide OOXML presentation writer for a single sick-leave report
// ABOUTME: Packages slides, master, layout and theme parts into a deterministic zip

use std::io::{Cursor, Write};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::{ExportError, ReportPayload, xml_escape};

const EMU_PER_INCH: i64 = 914_400;
const SLIDE_CX: i64 = 9_144_000;
const SLIDE_CY: i64 = 5_143_500;
const ACCENT: &str = "363794";

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH as f64).round() as i64
}

struct TextStyle {
    size_pt: u32,
    bold: bool,
    color: Option<&'static str>,
    centered: bool,
}

impl TextStyle {
    const fn body(size_pt: u32) -> Self {
        Self {
            size_pt,
            bold: false,
            color: None,
            centered: false,
        }
    }

    const fn heading(size_pt: u32) -> Self {
        Self {
            size_pt,
            bold: true,
            color: Some(ACCENT),
            centered: true,
        }
    }
}

fn run(text: &str, style: &TextStyle) -> String {
    let fill = style
        .color
        .map(|c| format!(r#"<a:solidFill><a:srgbClr val="{c}"/></a:solidFill>"#))
        .unwrap_or_default();
    format!(
        r#"<a:r><a:rPr lang="ar-SA" sz="{}" b="{}" dirty="0">{}</a:rPr><a:t>{}</a:t></a:r>"#,
        style.size_pt * 100,
        u8::from(style.bold),
        fill,
        xml_escape(text)
    )
}

fn paragraph(text: &str, style: &TextStyle) -> String {
    let align = if style.centered { "ctr" } else { "r" };
    format!(
        r#"<a:p><a:pPr algn="{align}" rtl="1"/>{}</a:p>"#,
        run(text, style)
    )
}

fn text_box(id: u32, x: f64, y: f64, w: f64, h: f64, text: &str, style: &TextStyle) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="1"><a:spAutoFit/></a:bodyPr><a:lstStyle/>{}</p:txBody></p:sp>"#,
        emu(x),
        emu(y),
        emu(w),
        emu(h),
        paragraph(text, style)
    )
}

fn table_cell(text: &str, header: bool) -> String {
    let style = TextStyle {
        size_pt: 14,
        bold: header,
        color: header.then_some("FFFFFF"),
        centered: false,
    };
    let fill = if header {
        format!(r#"<a:solidFill><a:srgbClr val="{ACCENT}"/></a:solidFill>"#)
    } else {
        String::new()
    };
    format!(
        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr>{fill}</a:tcPr></a:tc>"#,
        paragraph(text, &style)
    )
}

fn table(id: u32, rows: &[(String, String)]) -> String {
    let (x, y, w, row_h) = (1.0, 1.4, 8.0, 0.38);
    let (label_w, value_w) = (emu(2.5), emu(5.5));

    let mut body = String::new();
    body.push_str(&format!(
        r#"<a:tr h="{}">{}{}</a:tr>"#,
        emu(row_h),
        table_cell("البيان", true),
        table_cell("القيمة", true)
    ));
    for (label, value) in rows {
        body.push_str(&format!(
            r#"<a:tr h="{}">{}{}</a:tr>"#,
            emu(row_h),
            table_cell(label, false),
            table_cell(value, false)
        ));
    }

    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1" rtl="1"/><a:tblGrid><a:gridCol w="{label_w}"/><a:gridCol w="{value_w}"/></a:tblGrid>{body}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        emu(x),
        emu(y),
        emu(w),
        emu(row_h) * (rows.len() as i64 + 1),
    )
}

fn slide(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn identity_slide(payload: &ReportPayload) -> String {
    let body = TextStyle::body(18);
    let shapes = [
        text_box(2, 1.0, 0.4, 8.0, 0.9, "تقرير طبي", &TextStyle::heading(36)),
        text_box(3, 1.0, 1.5, 8.0, 0.5, &format!("اسم المريض: {}", payload.name_ar), &body),
        text_box(4, 1.0, 2.0, 8.0, 0.5, &format!("Patient: {}", payload.name_en), &body),
        text_box(5, 1.0, 2.5, 8.0, 0.5, &format!("رقم الهوية: {}", payload.id_number), &body),
        text_box(6, 1.0, 3.0, 8.0, 0.5, &format!("رمز الخدمة: {}", payload.service_code), &body),
    ];
    slide(&shapes.concat())
}

fn stay_slide(payload: &ReportPayload) -> String {
    let rows = vec![
        (
            "تاريخ الدخول".to_string(),
            format!("{} ({})", payload.entry_date_gregorian, payload.entry_date_hijri),
        ),
        (
            "تاريخ الخروج".to_string(),
            format!("{} ({})", payload.exit_date_gregorian, payload.exit_date_hijri),
        ),
        ("عدد أيام الإقامة".to_string(), payload.days_count.to_string()),
        ("الجنسية".to_string(), payload.nationality_ar.clone()),
        ("اسم الطبيب".to_string(), payload.doctor_name_ar.clone()),
        ("المسمى الوظيفي".to_string(), payload.job_title_ar.clone()),
        ("اسم المستشفى".to_string(), payload.hospital_name_ar.clone()),
        ("تاريخ إصدار التقرير".to_string(), payload.report_issue_date.clone()),
    ];
    let shapes = [
        text_box(2, 1.0, 0.3, 8.0, 0.9, "تفاصيل الإقامة", &TextStyle::heading(32)),
        table(3, &rows),
    ];
    slide(&shapes.concat())
}

fn closing_slide(payload: &ReportPayload) -> String {
    let footer = TextStyle {
        centered: true,
        ..TextStyle::body(12)
    };
    let shapes = [
        text_box(2, 1.0, 1.8, 8.0, 1.0, "شكراً لكم", &TextStyle::heading(44)),
        text_box(
            3,
            1.0,
            4.0,
            8.0,
            0.5,
            &format!("تاريخ الطباعة: {} - {}", payload.print_date, payload.print_time),
            &footer,
        ),
    ];
    slide(&shapes.concat())
}

fn content_types(slides: usize) -> String {
    let overrides: String = (1..=slides)
        .map(|n| format!(r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>{overrides}</Types>"#
    )
}

fn relationships(entries: &[(&str, &str, String)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{id}" Type="{REL_BASE}/{kind}" Target="{target}"/>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{body}</Relationships>"#
    )
}

fn presentation(slides: usize) -> String {
    let ids: String = (1..=slides)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" rtl="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_CX}" cy="{SLIDE_CY}"/><p:notesSz cx="{SLIDE_CY}" cy="{SLIDE_CX}"/></p:presentation>"#
    )
}

fn slide_master() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme() -> String {
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = format!(r#"<a:ln w="9525">{solid}</a:ln>"#);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="{NS_A}" name="Report"><a:themeElements><a:clrScheme name="Report"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F2937"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2><a:accent1><a:srgbClr val="{ACCENT}"/></a:accent1><a:accent2><a:srgbClr val="4946E5"/></a:accent2><a:accent3><a:srgbClr val="10B981"/></a:accent3><a:accent4><a:srgbClr val="F59E0B"/></a:accent4><a:accent5><a:srgbClr val="EF4444"/></a:accent5><a:accent6><a:srgbClr val="6B7280"/></a:accent6><a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink></a:clrScheme><a:fontScheme name="Report"><a:majorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface="Arial"/></a:majorFont><a:minorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface="Arial"/></a:minorFont></a:fontScheme><a:fmtScheme name="Report"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

pub fn render(payload: &ReportPayload) -> Result<Vec<u8>, ExportError> {
    let slides = [
        identity_slide(payload),
        stay_slide(payload),
        closing_slide(payload),
    ];

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types(slides.len())),
        (
            "_rels/.rels".into(),
            relationships(&[("rId1", "officeDocument", "ppt/presentation.xml".into())]),
        ),
        ("ppt/presentation.xml".into(), presentation(slides.len())),
    ];

    let mut presentation_rels = vec![(
        "rId1".to_string(),
        "slideMaster",
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for n in 1..=slides.len() {
        presentation_rels.push((format!("rId{}", n + 1), "slide", format!("slides/slide{n}.xml")));
    }
    presentation_rels.push((
        format!("rId{}", slides.len() + 2),
        "theme",
        "theme/theme1.xml".to_string(),
    ));
    let presentation_rels: Vec<(&str, &str, String)> = presentation_rels
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.clone()))
        .collect();
    parts.push((
        "ppt/_rels/presentation.xml.rels".into(),
        relationships(&presentation_rels),
    ));

    parts.push(("ppt/slideMasters/slideMaster1.xml".into(), slide_master()));
    parts.push((
        "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml".into()),
            ("rId2", "theme", "../theme/theme1.xml".into()),
        ]),
    ));
    parts.push(("ppt/slideLayouts/slideLayout1.xml".into(), slide_layout()));
    parts.push((
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml".into())]),
    ));
    parts.push(("ppt/theme/theme1.xml".into(), theme()));

    for (index, body) in slides.into_iter().enumerate() {
        let n = index + 1;
        parts.push((format!("ppt/slides/slide{n}.xml"), body));
        parts.push((
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml".into())]),
        ));
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        writer.start_file(name, options)?;
        writer.write_all(body.as_bytes())?;
    }
    Ok(writer.finish()?.into_inner())
}
