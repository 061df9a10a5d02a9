//! Text encoding of spooled events (`date;raw_identifier`)

use chrono::NaiveDate;

/// Field separator of the intermediate spool format
pub const SPOOL_SEPARATOR: char = ';';

/// Date layout used in spool lines and output artifacts
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encode one spooled event as a single line without the trailing newline.
///
/// Identifiers never contain the separator since the classifier strips semicolons.
pub fn encode_spool_line(date: NaiveDate, raw_identifier: &str) -> String {
    format!("{}{}{}", date.format(DATE_FORMAT), SPOOL_SEPARATOR, raw_identifier)
}

/// Decode a spool line back into its date and raw identifier.
///
/// Returns `None` when the line is blank or does not carry a valid date.
pub fn decode_spool_line(line: &str) -> Option<(NaiveDate, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (date, identifier) = line.split_once(SPOOL_SEPARATOR)?;
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    Some((date, identifier))
}
