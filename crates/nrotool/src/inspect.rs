use bytesize::ByteSize;
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};
use eyre_pretty::{Context, Result};
use nrofmt::{
    Editor,
    asset::{self, SectionInfo, SectionKind},
    nacp, nro,
};
use std::path::{Path, PathBuf};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|name| Cell::new(name).set_alignment(CellAlignment::Center)),
        );

    table
}

fn header_table(header: &nro::Header) {
    let mut properties = table(vec!["Property", "Value"]);

    properties.add_row(vec![
        Cell::new("Payload Size"),
        Cell::new(format!(
            "0x{:08X} ({})",
            header.size,
            ByteSize(header.size as u64).display()
        )),
    ]);

    let segments = [
        (".text", header.text()),
        (".rodata", header.rodata()),
        (".data", header.data()),
    ];

    for (name, segment) in segments {
        properties.add_row(vec![
            Cell::new(name),
            Cell::new(format!(
                "0x{:08X}..0x{:08X} ({})",
                segment.offset,
                u64::from(segment.offset) + u64::from(segment.size),
                ByteSize(segment.size as u64).display()
            )),
        ]);
    }

    properties.add_row(vec![
        Cell::new(".bss"),
        Cell::new(format!(
            "0x{:08X} ({})",
            header.bss_size,
            ByteSize(header.bss_size as u64).display()
        )),
    ]);

    let build_id = header.build_id_hex();
    properties.add_row(vec![
        Cell::new("Build ID"),
        Cell::new(if build_id.is_empty() {
            "-".to_owned()
        } else {
            build_id
        }),
    ]);

    println!("{properties}");
}

fn assets_table(header: Option<asset::Header>, base: u64) {
    let Some(header) = header else {
        println!("no asset block");
        return;
    };

    let mut sections = table(vec![
        "Section",
        "Position",
        "File Offset",
        "Length",
        "Length (Bytes)",
    ]);

    let mut row = |kind: SectionKind, info: SectionInfo| {
        if info.size == 0 {
            sections.add_row(vec![
                Cell::new(kind),
                Cell::new("-").set_alignment(CellAlignment::Center),
                Cell::new("-").set_alignment(CellAlignment::Center),
                Cell::new("-").set_alignment(CellAlignment::Center),
                Cell::new("absent").set_alignment(CellAlignment::Center),
            ]);
            return;
        }

        sections.add_row(vec![
            Cell::new(kind),
            Cell::new(format!("0x{:08X}", info.position)),
            Cell::new(format!("0x{:08X}", base + info.position)),
            Cell::new(format!("0x{:08X}", info.size)),
            Cell::new(format!("{}", ByteSize(info.size).display()))
                .set_alignment(CellAlignment::Center),
        ]);
    };

    for kind in [SectionKind::Icon, SectionKind::Nacp, SectionKind::RomFs] {
        row(kind, header.section(kind));
    }

    println!("{sections}");
}

fn metadata_table(editor: &Editor, languages: bool) -> Result<()> {
    if languages {
        let mut entries = table(vec!["Language", "Name", "Author"]);
        for entry in nacp::entries(editor.assets().nacp.bytes()).context("parsing nacp")? {
            entries.add_row(vec![
                Cell::new(entry.language),
                Cell::new(entry.name),
                Cell::new(entry.author),
            ]);
        }

        println!("{entries}");
    }

    let mut properties = table(vec!["Metadata", "Value"]);
    properties.add_row(vec![Cell::new("Title"), Cell::new(editor.name())]);
    properties.add_row(vec![Cell::new("Author"), Cell::new(editor.author())]);
    properties.add_row(vec![Cell::new("Version"), Cell::new(editor.version())]);
    println!("{properties}");

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn inspect_nro(input: PathBuf, languages: bool) -> Result<()> {
    let bytes = std::fs::read(&input).context("reading input file")?;
    let len = bytes.len() as u64;

    let header = nro::locate(&bytes).context("parsing .nro header")?;
    let base = header.size as usize;
    let stored = asset::read_header(&bytes, base).context("parsing asset header")?;
    let editor = Editor::open(bytes).context("parsing .nro")?;

    let mut info = Table::new();
    info.load_preset(comfy_table::presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new(format!(
            "{} ({})",
            file_name(&input),
            ByteSize(len).display()
        ))]);

    println!("{info}");
    header_table(&header);
    assets_table(stored, base as u64);
    metadata_table(&editor, languages)?;

    Ok(())
}

/// Prints the metadata the way the edit command reports it.
pub fn print_metadata(title: &str, editor: &Editor) {
    println!("-> {title}:");
    println!("--> Title: {}", editor.name());
    println!("--> Author: {}", editor.author());
    println!("--> Version: {}", editor.version());
}
