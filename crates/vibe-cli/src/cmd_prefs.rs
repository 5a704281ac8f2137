use crate::workstation::Workstation;
use anyhow::Result;
use std::io::Read;
use std::path::Path;
use vibe_store::{catalog, DocumentKind, DOCUMENTS};

/// Execute `vibe prefs get <name>`.
pub fn get(ws: &Workstation, name: &str) -> Result<()> {
    let doc = catalog::require(name)?;
    let content = ws.store().read_document(doc)?;
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Execute `vibe prefs set <name> [--file PATH]`.
pub fn set(ws: &Workstation, name: &str, file: Option<&Path>) -> Result<()> {
    let doc = catalog::require(name)?;
    let body = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            body
        }
    };
    let message = ws.store().write_document(doc, &body)?;
    println!("{message}");
    Ok(())
}

/// Execute `vibe prefs list`.
pub fn list(ws: &Workstation) -> Result<()> {
    let store = ws.store();
    println!("Preferences in {}", store.dir().display());
    for doc in DOCUMENTS {
        let kind = match doc.kind {
            DocumentKind::Json => "json",
            DocumentKind::Text => "text",
        };
        let state = if store.exists(doc.file_name) {
            "saved"
        } else {
            "default"
        };
        println!("  {:<18} {:<22} {kind:<5} {state}", doc.key, doc.file_name);
    }
    Ok(())
}
