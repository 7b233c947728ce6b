//! SEEG contact placement from electrode schemes.
//!
//! A scheme file lists one electrode per line:
//!
//! ```text
//! # name  target xyz        entry xyz          n   [spacing]
//! A       10.0 -20.0 5.0    60.0 -22.0 15.0    12
//! B'      -8.5  12.0 0.0   -55.0  10.0 20.0    10  "2 2 2 2 11 2 2 2 2"
//! ```
//!
//! Contacts start at the target and walk towards the entry point. The
//! optional quoted spacing pattern repeats cyclically.

use std::fmt::Write as _;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use seeg_core::{Contact, ElectrodeSpec, PlacementError, Position, SpacingPattern};

use crate::config::PlacementConfig;
use crate::error::{ForwardError, ForwardResult};
use crate::io;
use crate::transform::CoordinateTransform;

/// Place the contacts of one electrode.
///
/// Contact `i` is named `{name}{i + 1}` and sits at `target + d_i · u`, where
/// `u` points from target to entry and `d_i` is the cumulative spacing.
///
/// # Errors
///
/// `InvalidContactCount` when `ncontacts` is zero, `ZeroLengthElectrode`
/// when target and entry coincide.
pub fn gen_contacts_on_electrode(
    name: &str,
    target: &Position,
    entry: &Position,
    ncontacts: usize,
    spacing_pattern: &SpacingPattern,
) -> Result<Vec<Contact>, PlacementError> {
    let spec = ElectrodeSpec::new(name, *target, *entry, ncontacts).with_spacing(spacing_pattern.clone());
    place_contacts(&spec)
}

/// Place the contacts described by an electrode spec.
///
/// # Errors
///
/// See [`gen_contacts_on_electrode`].
pub fn place_contacts(spec: &ElectrodeSpec) -> Result<Vec<Contact>, PlacementError> {
    spec.validate()?;
    let direction = spec.direction()?;
    Ok(spec
        .spacing
        .cumulative(spec.ncontacts)
        .into_iter()
        .enumerate()
        .map(|(i, dist)| Contact::new(Contact::contact_name(&spec.name, i), spec.target + direction * dist))
        .collect())
}

// ============================================================================
// Scheme parsing
// ============================================================================

/// Split a line on spaces, keeping double-quoted fields whole.
///
/// Tabs count as spaces. Empty fields, from repeated delimiters or an empty
/// quoted string, are dropped.
///
/// # Errors
///
/// The tokenizer error when the line is not valid delimited text.
pub fn split_fields(line: &str) -> Result<Vec<String>, csv::Error> {
    let normalized = line.replace('\t', " ");
    let mut reader = ReaderBuilder::new()
        .delimiter(b' ')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_reader(normalized.as_bytes());

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(Vec::new());
    }
    Ok(record.iter().filter(|f| !f.is_empty()).map(str::to_string).collect())
}

fn parse_number<T: std::str::FromStr>(line: usize, field: &'static str, value: &str) -> ForwardResult<T> {
    value.parse().map_err(|_| ForwardError::SchemeValue {
        line,
        field,
        value: value.to_string(),
    })
}

fn parse_point(line: usize, field: &'static str, values: &[String]) -> ForwardResult<Position> {
    Ok(Position::new(
        parse_number(line, field, &values[0])?,
        parse_number(line, field, &values[1])?,
        parse_number(line, field, &values[2])?,
    ))
}

/// Parse one scheme line; `None` for blank and comment lines.
///
/// # Errors
///
/// `SchemeFieldCount`, `SchemeValue` or `InvalidElectrode`.
pub fn parse_scheme_line(
    text: &str,
    line: usize,
    default_spacing: &SpacingPattern,
) -> ForwardResult<Option<ElectrodeSpec>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let fields = split_fields(trimmed).map_err(|source| ForwardError::SchemeSyntax { line, source })?;
    if fields.len() != 8 && fields.len() != 9 {
        return Err(ForwardError::SchemeFieldCount {
            line,
            found: fields.len(),
            text: text.to_string(),
        });
    }

    let invalid = |source: PlacementError| ForwardError::InvalidElectrode { line, source };

    let target = parse_point(line, "target", &fields[1..4])?;
    let entry = parse_point(line, "entry", &fields[4..7])?;
    let count: i64 = parse_number(line, "contact count", &fields[7])?;
    let ncontacts = usize::try_from(count)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| invalid(PlacementError::InvalidContactCount { count }))?;
    let spacing = match fields.get(8) {
        Some(pattern) => SpacingPattern::parse(pattern).map_err(invalid)?,
        None => default_spacing.clone(),
    };

    let spec = ElectrodeSpec::new(fields[0].as_str(), target, entry, ncontacts).with_spacing(spacing);
    spec.validate().map_err(invalid)?;
    Ok(Some(spec))
}

/// Parse a complete scheme.
///
/// # Errors
///
/// The first line error, see [`parse_scheme_line`].
pub fn parse_scheme(text: &str, default_spacing: &SpacingPattern) -> ForwardResult<Vec<ElectrodeSpec>> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_scheme_line(line, i + 1, default_spacing).transpose())
        .collect()
}

// ============================================================================
// Contact files
// ============================================================================

/// Render contacts as fixed-width `name x y z` lines.
#[must_use]
pub fn format_contacts(contacts: &[Contact]) -> String {
    let mut out = String::with_capacity(contacts.len() * 32);
    for c in contacts {
        let p = &c.position;
        let _ = writeln!(out, "{:<6} {:7.2} {:7.2} {:7.2}", c.name, p.x, p.y, p.z);
    }
    out
}

/// Read a contact file back as `(labels, coordinates)`.
///
/// # Errors
///
/// `MissingInput`, `Io` or `Format`.
pub fn read_seeg_labels_coords_file(path: &Path) -> ForwardResult<(Vec<String>, Vec<Position>)> {
    io::read_labeled_positions(path)
}

/// Place every electrode of a scheme file and write the contact table.
///
/// Target and entry points go through `transform` when one is given. The
/// output file is only created once every electrode has been placed.
///
/// # Errors
///
/// Scheme parsing errors, placement errors, or I/O failures.
pub fn gen_seeg_xyz_from_endpoints(
    scheme_file: &Path,
    out_file: &Path,
    transform: Option<&dyn CoordinateTransform>,
    config: &PlacementConfig,
) -> ForwardResult<Vec<Contact>> {
    let text = io::read_text(scheme_file)?;
    let electrodes = parse_scheme(&text, &config.default_spacing)?;

    let mut contacts = Vec::new();
    for mut spec in electrodes {
        if let Some(t) = transform {
            spec.target = t.transform_coords(&spec.target);
            spec.entry = t.transform_coords(&spec.entry);
        }
        let placed = place_contacts(&spec)?;
        tracing::debug!(electrode = %spec.name, contacts = placed.len(), "Placed electrode");
        contacts.extend(placed);
    }

    io::write_text(out_file, &format_contacts(&contacts))?;
    tracing::info!(
        scheme = %scheme_file.display(),
        out = %out_file.display(),
        contacts = contacts.len(),
        "Wrote SEEG contacts"
    );
    Ok(contacts)
}
