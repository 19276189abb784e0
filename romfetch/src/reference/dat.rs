//! Dat file parsing and the four-way lookup index.
//!
//! Two dat dialects are accepted:
//!
//! - Logiqx XML: `<datafile>` with repeated `<game name="...">` elements, each
//!   holding optional `<description>`, `<year>`, `<manufacturer>` and `<rom>`
//!   children. The `rom` element carries `crc`/`md5`/`sha1` attributes.
//! - clrmamepro text: `game ( name "..." rom ( crc ... md5 ... ) )` blocks, the
//!   format served by the libretro database.
//!
//! Only the first `rom` of a game feeds the checksum maps. Games without a
//! `rom` are still indexed by name.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use super::ReferenceEntry;

/// Errors raised while parsing a dat document.
#[derive(Debug, Error)]
pub enum DatError {
    /// The XML document does not match the dat schema.
    #[error("invalid XML dat: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The clrmamepro document is malformed.
    #[error("invalid clrmamepro dat: {0}")]
    Syntax(String),
}

/// Parsed dat file indexed by filename and by checksum.
///
/// Later entries replace earlier ones on key collisions.
#[derive(Debug, Clone, Default)]
pub struct DatIndex {
    entries: Vec<ReferenceEntry>,
    by_filename: HashMap<String, usize>,
    by_crc: HashMap<String, usize>,
    by_md5: HashMap<String, usize>,
    by_sha1: HashMap<String, usize>,
}

impl DatIndex {
    /// Build the index, normalizing checksums to lowercase hex.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Self {
        let mut index = Self::default();

        for mut entry in entries {
            entry.crc = normalize_hash(entry.crc.as_deref());
            entry.md5 = normalize_hash(entry.md5.as_deref());
            entry.sha1 = normalize_hash(entry.sha1.as_deref());

            let slot = index.entries.len();
            index.by_filename.insert(entry.name.clone(), slot);
            if let Some(crc) = &entry.crc {
                index.by_crc.insert(crc.clone(), slot);
            }
            if let Some(md5) = &entry.md5 {
                index.by_md5.insert(md5.clone(), slot);
            }
            if let Some(sha1) = &entry.sha1 {
                index.by_sha1.insert(sha1.clone(), slot);
            }
            index.entries.push(entry);
        }

        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Exact match on the game name.
    pub fn by_filename(&self, name: &str) -> Option<&ReferenceEntry> {
        self.lookup(&self.by_filename, name)
    }

    pub fn by_crc(&self, crc: &str) -> Option<&ReferenceEntry> {
        self.lookup_hash(&self.by_crc, crc)
    }

    pub fn by_md5(&self, md5: &str) -> Option<&ReferenceEntry> {
        self.lookup_hash(&self.by_md5, md5)
    }

    pub fn by_sha1(&self, sha1: &str) -> Option<&ReferenceEntry> {
        self.lookup_hash(&self.by_sha1, sha1)
    }

    fn lookup(&self, map: &HashMap<String, usize>, key: &str) -> Option<&ReferenceEntry> {
        map.get(key).map(|&slot| &self.entries[slot])
    }

    fn lookup_hash(&self, map: &HashMap<String, usize>, hash: &str) -> Option<&ReferenceEntry> {
        let normalized = normalize_hash(Some(hash))?;
        self.lookup(map, &normalized)
    }
}

fn normalize_hash(hash: Option<&str>) -> Option<String> {
    hash.map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_ascii_lowercase)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a dat document of either dialect.
pub fn parse_dat(text: &str) -> Result<DatIndex, DatError> {
    let text = text.trim_start_matches('\u{feff}');
    let entries = if text.trim_start().starts_with('<') {
        parse_xml(text)?
    } else {
        parse_clrmamepro(text)?
    };
    Ok(DatIndex::from_entries(entries))
}

// ============================================================================
// Logiqx XML
// ============================================================================

#[derive(Debug, Deserialize)]
struct XmlDatafile {
    #[serde(rename = "game", default)]
    games: Vec<XmlGame>,
}

#[derive(Debug, Deserialize)]
struct XmlGame {
    #[serde(rename = "@name", default)]
    name: String,
    description: Option<String>,
    year: Option<String>,
    manufacturer: Option<String>,
    #[serde(rename = "rom", default)]
    roms: Vec<XmlRom>,
}

#[derive(Debug, Deserialize)]
struct XmlRom {
    #[serde(rename = "@crc")]
    crc: Option<String>,
    #[serde(rename = "@md5")]
    md5: Option<String>,
    #[serde(rename = "@sha1")]
    sha1: Option<String>,
}

fn parse_xml(text: &str) -> Result<Vec<ReferenceEntry>, DatError> {
    let datafile: XmlDatafile = quick_xml::de::from_str(text)?;

    Ok(datafile
        .games
        .into_iter()
        .map(|game| {
            let rom = game.roms.into_iter().next();
            let (crc, md5, sha1) = match rom {
                Some(rom) => (rom.crc, rom.md5, rom.sha1),
                None => (None, None, None),
            };
            ReferenceEntry {
                name: game.name,
                description: non_empty(game.description),
                year: non_empty(game.year),
                manufacturer: non_empty(game.manufacturer),
                crc,
                md5,
                sha1,
            }
        })
        .collect())
}

// ============================================================================
// clrmamepro text
// ============================================================================

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Open,
    Close,
    Value(&'a str),
}

#[derive(Debug)]
enum Field<'a> {
    Value(&'a str),
    Block(Vec<(&'a str, Field<'a>)>),
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, DatError> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b if b.is_ascii_whitespace() => pos += 1,
            b'(' => {
                tokens.push(Token::Open);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::Close);
                pos += 1;
            }
            b'"' => {
                let start = pos + 1;
                let len = text[start..]
                    .find('"')
                    .ok_or_else(|| DatError::Syntax("unterminated string".to_string()))?;
                tokens.push(Token::Value(&text[start..start + len]));
                pos = start + len + 1;
            }
            _ => {
                let start = pos;
                while pos < bytes.len()
                    && !bytes[pos].is_ascii_whitespace()
                    && !matches!(bytes[pos], b'(' | b')')
                {
                    pos += 1;
                }
                tokens.push(Token::Value(&text[start..pos]));
            }
        }
    }

    Ok(tokens)
}

fn parse_block<'a, I>(tokens: &mut I) -> Result<Vec<(&'a str, Field<'a>)>, DatError>
where
    I: Iterator<Item = Token<'a>>,
{
    let mut fields = Vec::new();
    loop {
        match tokens.next() {
            Some(Token::Close) => return Ok(fields),
            Some(Token::Value(key)) => match tokens.next() {
                Some(Token::Open) => fields.push((key, Field::Block(parse_block(tokens)?))),
                Some(Token::Value(value)) => fields.push((key, Field::Value(value))),
                _ => return Err(DatError::Syntax(format!("missing value for '{}'", key))),
            },
            Some(Token::Open) => return Err(DatError::Syntax("unexpected '('".to_string())),
            None => return Err(DatError::Syntax("unterminated block".to_string())),
        }
    }
}

fn field_value(fields: &[(&str, Field<'_>)], key: &str) -> Option<String> {
    fields.iter().find_map(|(k, f)| match f {
        Field::Value(v) if *k == key => Some(v.to_string()),
        _ => None,
    })
}

fn parse_clrmamepro(text: &str) -> Result<Vec<ReferenceEntry>, DatError> {
    let mut tokens = tokenize(text)?.into_iter();
    let mut entries = Vec::new();

    while let Some(token) = tokens.next() {
        let Token::Value(kind) = token else {
            return Err(DatError::Syntax("expected a block name".to_string()));
        };
        if tokens.next() != Some(Token::Open) {
            return Err(DatError::Syntax(format!("expected '(' after '{}'", kind)));
        }
        let fields = parse_block(&mut tokens)?;
        if kind != "game" && kind != "machine" {
            continue;
        }

        let rom = fields.iter().find_map(|(k, f)| match f {
            Field::Block(rom) if *k == "rom" => Some(rom.as_slice()),
            _ => None,
        });

        entries.push(ReferenceEntry {
            name: field_value(&fields, "name").unwrap_or_default(),
            description: non_empty(field_value(&fields, "description")),
            year: non_empty(
                field_value(&fields, "year").or_else(|| field_value(&fields, "releaseyear")),
            ),
            manufacturer: non_empty(
                field_value(&fields, "manufacturer").or_else(|| field_value(&fields, "developer")),
            ),
            crc: rom.and_then(|r| field_value(r, "crc")),
            md5: rom.and_then(|r| field_value(r, "md5")),
            sha1: rom.and_then(|r| field_value(r, "sha1")),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML_DAT: &str = r#"<?xml version="1.0"?>
<!DOCTYPE datafile PUBLIC "-//Logiqx//DTD ROM Management Datafile//EN" "http://www.logiqx.com/Dats/datafile.dtd">
<datafile>
  <header>
    <name>Sega - 32X</name>
    <description>Sega - 32X</description>
  </header>
  <game name="Doom (Europe)">
    <description>Doom (Europe)</description>
    <year>1994</year>
    <manufacturer>Sega</manufacturer>
    <rom name="Doom (Europe).32x" size="3145728" crc="208332FD" md5="A1B2C3D4E5F60718293A4B5C6D7E8F90" sha1="ABCDEF0123456789ABCDEF0123456789ABCDEF01"/>
    <rom name="Doom (Europe) (Alt).32x" size="3145728" crc="11111111"/>
  </game>
  <game name="Tempo (Japan)">
    <description>Tempo &amp; Friends</description>
    <rom name="Tempo (Japan).32x" crc="deadbeef"/>
  </game>
  <game name="Prototype (No ROM)">
    <description>Lost</description>
  </game>
</datafile>"#;

    const CLRMAMEPRO_DAT: &str = r#"clrmamepro (
	name "Sega - 32X"
	description "Sega - 32X"
	version 20240101
)

game (
	name "Doom (Europe)"
	description "Doom (Europe)"
	developer "id Software"
	releaseyear "1994"
	rom ( name "Doom (Europe).32x" size 3145728 crc 208332FD md5 A1B2C3D4E5F60718293A4B5C6D7E8F90 sha1 ABCDEF0123456789ABCDEF0123456789ABCDEF01 )
)

game (
	name "Tempo (Japan)"
	year "1995"
	rom ( name "Tempo (Japan).32x" size 1 crc deadbeef )
)
"#;

    #[test]
    fn test_parse_xml_builds_four_maps() {
        let index = parse_dat(XML_DAT).unwrap();
        assert_eq!(index.len(), 3);

        let doom = index.by_filename("Doom (Europe)").unwrap();
        assert_eq!(doom.year.as_deref(), Some("1994"));
        assert_eq!(doom.manufacturer.as_deref(), Some("Sega"));
        assert_eq!(doom.crc.as_deref(), Some("208332fd"));

        assert_eq!(index.by_crc("208332fd").unwrap().name, "Doom (Europe)");
        assert_eq!(
            index.by_md5("a1b2c3d4e5f60718293a4b5c6d7e8f90").unwrap().name,
            "Doom (Europe)"
        );
        assert_eq!(
            index.by_sha1("abcdef0123456789abcdef0123456789abcdef01").unwrap().name,
            "Doom (Europe)"
        );
    }

    #[test]
    fn test_only_first_rom_is_indexed() {
        let index = parse_dat(XML_DAT).unwrap();
        assert!(index.by_crc("11111111").is_none());
    }

    #[test]
    fn test_lookups_normalize_case() {
        let index = parse_dat(XML_DAT).unwrap();
        assert_eq!(index.by_crc("DEADBEEF").unwrap().name, "Tempo (Japan)");
        assert_eq!(index.by_crc(" 208332FD ").unwrap().name, "Doom (Europe)");
    }

    #[test]
    fn test_game_without_rom_is_filename_only() {
        let index = parse_dat(XML_DAT).unwrap();
        let proto = index.by_filename("Prototype (No ROM)").unwrap();
        assert!(proto.crc.is_none() && proto.md5.is_none() && proto.sha1.is_none());
        assert_eq!(proto.description.as_deref(), Some("Lost"));
    }

    #[test]
    fn test_xml_entities_are_decoded() {
        let index = parse_dat(XML_DAT).unwrap();
        assert_eq!(
            index.by_filename("Tempo (Japan)").unwrap().description.as_deref(),
            Some("Tempo & Friends")
        );
    }

    #[test]
    fn test_parse_clrmamepro() {
        let index = parse_dat(CLRMAMEPRO_DAT).unwrap();
        assert_eq!(index.len(), 2);

        let doom = index.by_filename("Doom (Europe)").unwrap();
        assert_eq!(doom.manufacturer.as_deref(), Some("id Software"));
        assert_eq!(doom.year.as_deref(), Some("1994"));
        assert_eq!(doom.crc.as_deref(), Some("208332fd"));
        assert_eq!(index.by_md5("A1B2C3D4E5F60718293A4B5C6D7E8F90").unwrap().name, "Doom (Europe)");

        let tempo = index.by_crc("deadbeef").unwrap();
        assert_eq!(tempo.year.as_deref(), Some("1995"));
        assert!(tempo.sha1.is_none());
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse_dat("<datafile><game"), Err(DatError::Xml(_))));
        assert!(matches!(parse_dat("game ( name \"x\" "), Err(DatError::Syntax(_))));
        assert!(matches!(parse_dat("game name"), Err(DatError::Syntax(_))));
    }

    #[test]
    fn test_empty_hash_attributes_are_ignored() {
        let index = DatIndex::from_entries(vec![ReferenceEntry {
            name: "Blank".to_string(),
            description: None,
            year: None,
            manufacturer: None,
            crc: Some(String::new()),
            md5: Some("  ".to_string()),
            sha1: None,
        }]);
        assert!(index.by_crc("").is_none());
        assert!(index.entries()[0].crc.is_none());
    }
}
