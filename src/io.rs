use std::fs;
use std::path::Path;

use crate::error::{VmError, VmResult};
use crate::simulation::Reference;
use crate::translation::Access;

/// Read a reference trace: one `R <page>` or `W <page>` per line. Blank
/// lines and lines starting with `#` are skipped.
pub fn read_trace<P: AsRef<Path>>(path: P, npages: usize) -> VmResult<Vec<Reference>> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| VmError::Io {
        message: format!("Failed to read trace file {}: {}", path.as_ref().display(), e),
    })?;
    parse_trace(&content, npages)
}

pub fn parse_trace(content: &str, npages: usize) -> VmResult<Vec<Reference>> {
    let mut references = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        references.push(parse_line(line, idx + 1, npages)?);
    }

    Ok(references)
}

fn parse_line(line: &str, lineno: usize, npages: usize) -> VmResult<Reference> {
    let invalid = |reason: String| VmError::InvalidTrace { line: lineno, reason };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(invalid(format!("expected 2 tokens, got {}", tokens.len())));
    }

    let access = match tokens[0] {
        "R" | "r" => Access::Read,
        "W" | "w" => Access::Write,
        other => return Err(invalid(format!("unknown access type: {}", other))),
    };
    let page: usize = tokens[1]
        .parse()
        .map_err(|_| invalid(format!("Invalid page number: {}", tokens[1])))?;
    if page >= npages {
        return Err(invalid(format!("Page number {} out of range (npages = {})", page, npages)));
    }

    Ok(Reference { page, access })
}
