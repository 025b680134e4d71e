// Footer metadata: roll number, lab, date, notes

use serde::Deserialize;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::{SheetError, SheetResult};

/// One footer line kind, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterField {
    SerialNumber,
    Laboratory,
    Date,
    Notes,
}

impl FooterField {
    pub const ALL: [FooterField; 4] = [
        FooterField::SerialNumber,
        FooterField::Laboratory,
        FooterField::Date,
        FooterField::Notes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FooterField::SerialNumber => "Roll:",
            FooterField::Laboratory => "Scanned by:",
            FooterField::Date => "Date:",
            FooterField::Notes => "Notes:",
        }
    }

    fn prompt(&self) -> &'static str {
        match self {
            FooterField::SerialNumber => "Roll / serial number",
            FooterField::Laboratory => "Scanned by (lab)",
            FooterField::Date => "Date",
            FooterField::Notes => "Notes",
        }
    }
}

/// Metadata supplied once per run. Blank and whitespace-only values are
/// stored as None, so a present field always has visible text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    pub serial_number: Option<String>,
    pub laboratory: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl MetadataRecord {
    pub fn new(
        serial_number: Option<String>,
        laboratory: Option<String>,
        date: Option<String>,
        notes: Option<String>,
    ) -> Self {
        MetadataRecord {
            serial_number,
            laboratory,
            date,
            notes,
        }
        .normalized()
    }

    pub fn normalized(self) -> Self {
        MetadataRecord {
            serial_number: clean(self.serial_number),
            laboratory: clean(self.laboratory),
            date: clean(self.date),
            notes: clean(self.notes),
        }
    }

    pub fn get(&self, field: FooterField) -> Option<&str> {
        let value = match field {
            FooterField::SerialNumber => &self.serial_number,
            FooterField::Laboratory => &self.laboratory,
            FooterField::Date => &self.date,
            FooterField::Notes => &self.notes,
        };
        value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn slot(&mut self, field: FooterField) -> &mut Option<String> {
        match field {
            FooterField::SerialNumber => &mut self.serial_number,
            FooterField::Laboratory => &mut self.laboratory,
            FooterField::Date => &mut self.date,
            FooterField::Notes => &mut self.notes,
        }
    }

    /// Present fields in footer order.
    pub fn present_fields(&self) -> impl Iterator<Item = (FooterField, &str)> + '_ {
        FooterField::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().next().is_none()
    }

    /// Fields present in `self` win; the rest come from `base`.
    pub fn overlay(self, base: MetadataRecord) -> Self {
        let mut merged = base.normalized();
        let top = self.normalized();
        for field in FooterField::ALL {
            if let Some(v) = top.get(field) {
                *merged.slot(field) = Some(v.to_string());
            }
        }
        merged
    }

    /// Load from a JSON object with optional `serial_number`, `laboratory`,
    /// `date` and `notes` keys.
    pub fn from_json_file(path: &Path) -> SheetResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SheetError::Metadata(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> SheetResult<Self> {
        let record: MetadataRecord = serde_json::from_str(content)
            .map_err(|e| SheetError::Metadata(format!("Invalid JSON: {}", e)))?;
        Ok(record.normalized())
    }

    /// Ask for each field in turn. An empty answer leaves the field absent;
    /// end of input stops asking.
    pub fn prompt<R: BufRead, W: Write>(mut input: R, mut output: W) -> SheetResult<Self> {
        let mut record = MetadataRecord::default();
        for field in FooterField::ALL {
            write!(output, "{} (optional): ", field.prompt())?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            *record.slot(field) = Some(line);
        }
        writeln!(output)?;
        Ok(record.normalized())
    }
}
