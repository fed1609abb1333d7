use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::FormatError;
use crate::formatting::xml::XmlDocument;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

struct PackageEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// An OPC package held in memory. Entries keep their archive order so
/// `[Content_Types].xml` stays first when the package is written back.
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    pub fn open(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry { name, data, is_dir });
        }

        let package = Self { entries };
        if package.part(DOCUMENT_PART).is_none() {
            return Err(FormatError::MissingPart(DOCUMENT_PART.to_string()));
        }
        Ok(package)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| !e.is_dir && e.name == name)
            .map(|e| e.data.as_slice())
    }

    pub fn xml_part(&self, name: &str) -> Result<Option<XmlDocument>, FormatError> {
        let Some(bytes) = self.part(name) else {
            return Ok(None);
        };
        let xml = std::str::from_utf8(bytes).map_err(|_| FormatError::Encoding {
            part: name.to_string(),
        })?;
        // Some producers write a byte order mark ahead of the declaration.
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        XmlDocument::parse(name, xml).map(Some)
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| !e.is_dir && e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(PackageEntry {
                name: name.to_string(),
                data,
                is_dir: false,
            }),
        }
    }

    pub fn set_xml_part(&mut self, name: &str, document: &XmlDocument) {
        self.set_part(name, document.to_xml_string().into_bytes());
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.data)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}
