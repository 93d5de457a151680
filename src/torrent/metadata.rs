use std::borrow::Borrow;
use std::fmt;

use bytes::Bytes;
use log::debug;
use serde::{Serialize, Serializer};

use crate::bencode::{BValue, Dictionary};

/// One file described by a torrent.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String, // segments joined with '/'
    pub length: i64,
}

/// The standard fields of a .torrent file.
///
/// Produced by [`extract_metadata`]; absent or mistyped keys leave their
/// field at its default (empty / zero).
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub announce: String,           // The tracker URL
    pub announce_list: Vec<String>, // Backup trackers, tiers flattened in order
    pub created_by: String,
    pub creation_date: i64, // Unix timestamp
    pub comment: String,
    pub encoding: String,
    pub piece_length: i64, // Size of each piece
    #[serde(serialize_with = "serialize_hex")]
    pub pieces: Vec<u8>, // Concatenated SHA-1 piece hashes
    pub file_info: Vec<FileInfo>,
    pub multi_file: bool, // true when the info dict lists `files`
    /// Exact encoding of the `info` dictionary as it appeared in the input.
    #[serde(skip)]
    pub raw_info_dict: Bytes,
}

impl Metadata {
    /// Sum of all file lengths, saturating at `i64::MAX`/`i64::MIN`.
    pub fn total_length(&self) -> i64 {
        self.file_info
            .iter()
            .fold(0i64, |acc, f| acc.saturating_add(f.length))
    }

    /// Splits `pieces` into 20-byte hashes. A short trailing chunk is dropped.
    pub fn piece_hashes(&self) -> impl Iterator<Item = [u8; 20]> + '_ {
        self.pieces.chunks_exact(20).map(|chunk| {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(chunk);
            hash
        })
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len() / 20
    }

    pub fn is_multi_file(&self) -> bool {
        self.multi_file
    }

    /// The raw `info` dictionary bytes, ready to be hashed.
    pub fn info_bytes(&self) -> &[u8] {
        &self.raw_info_dict
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Tracker URL: {}", self.announce)?;
        if !self.announce_list.is_empty() {
            writeln!(f, "Trackers:")?;
            for url in &self.announce_list {
                writeln!(f, "  {}", url)?;
            }
        }
        writeln!(f, "Created By: {}", self.created_by)?;
        writeln!(f, "Creation Date: {}", self.creation_date)?;
        writeln!(f, "Comment: {}", self.comment)?;
        writeln!(f, "Encoding: {}", self.encoding)?;
        writeln!(f, "Piece Length: {}", self.piece_length)?;
        writeln!(f, "Number of Pieces: {}", self.piece_count())?;
        writeln!(f, "Files:")?;
        for file in &self.file_info {
            writeln!(f, "  {} ({} bytes)", file.path, file.length)?;
        }
        write!(f, "Total Length: {}", self.total_length())
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Projects a decoded .torrent dictionary onto [`Metadata`].
///
/// Only the standard keys are evaluated. This never fails: anything missing
/// or of the wrong kind falls back to the field's default.
pub fn extract_metadata<D: Borrow<Dictionary>>(root: D) -> Metadata {
    let root = root.borrow();
    let mut metadata = Metadata::default();

    for (key, value) in root.iter() {
        match key {
            b"announce" => metadata.announce = text(value),
            b"announce-list" => metadata.announce_list = flatten_tiers(value),
            b"comment" => metadata.comment = text(value),
            b"created by" => metadata.created_by = text(value),
            b"creation date" => metadata.creation_date = integer(value),
            b"encoding" => metadata.encoding = text(value),
            b"info" => match value {
                BValue::Dict(info) => read_info(info, &mut metadata),
                other => debug!("'info' is a {}, not a dict", other.kind()),
            },
            _ => {}
        }
    }

    metadata
}

fn read_info(info: &Dictionary, metadata: &mut Metadata) {
    metadata.raw_info_dict = info.raw();
    metadata.name = info.get(b"name").map(text).unwrap_or_default();
    metadata.piece_length = info.get(b"piece length").map(integer).unwrap_or_default();
    metadata.pieces = info.get_bytes(b"pieces").map(<[u8]>::to_vec).unwrap_or_default();

    if let Some(length) = info.get_integer(b"length") {
        metadata.file_info = vec![FileInfo {
            path: metadata.name.clone(),
            length,
        }];
    } else if let Some(files) = info.get_list(b"files") {
        metadata.multi_file = true;
        metadata.file_info = files.iter().filter_map(file_entry).collect();
    }
}

fn file_entry(value: &BValue) -> Option<FileInfo> {
    let BValue::Dict(entry) = value else {
        debug!("Skipping 'files' entry that is a {}", value.kind());
        return None;
    };

    let path = entry
        .get_list(b"path")
        .map(|segments| {
            segments
                .iter()
                .filter_map(BValue::as_bytes)
                .map(String::from_utf8_lossy)
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    Some(FileInfo {
        path,
        length: entry.get_integer(b"length").unwrap_or_default(),
    })
}

fn flatten_tiers(value: &BValue) -> Vec<String> {
    let Some(tiers) = value.as_list() else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for tier in tiers {
        match tier {
            BValue::List(tier) => urls.extend(
                tier.iter()
                    .filter_map(BValue::as_bytes)
                    .map(|b| String::from_utf8_lossy(b).into_owned()),
            ),
            BValue::ByteString(url) => urls.push(String::from_utf8_lossy(url).into_owned()),
            BValue::Integer(_) | BValue::Dict(_) => {
                debug!("Skipping announce-list tier that is a {}", tier.kind())
            }
        }
    }
    urls
}

fn text(value: &BValue) -> String {
    match value {
        BValue::ByteString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        BValue::Integer(_) | BValue::List(_) | BValue::Dict(_) => String::new(),
    }
}

fn integer(value: &BValue) -> i64 {
    match value {
        BValue::Integer(i) => *i,
        BValue::ByteString(_) | BValue::List(_) | BValue::Dict(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::{decode, DecodeMode};

    fn metadata(input: &[u8]) -> Metadata {
        extract_metadata(&decode(input, DecodeMode::Strict).unwrap())
    }

    #[test]
    fn test_single_file_torrent() {
        let meta = metadata(b"d4:infod6:lengthi100e4:name4:testeed8:announce3:xxxe");
        assert_eq!(meta.announce, "xxx");
        assert_eq!(meta.name, "test");
        assert_eq!(
            meta.file_info,
            vec![FileInfo {
                path: "test".to_string(),
                length: 100
            }]
        );
        assert!(!meta.is_multi_file());
    }

    #[test]
    fn test_multi_file_torrent() {
        let meta = metadata(
            b"d4:infod5:filesld6:lengthi10e4:pathl1:a5:b.txteed6:lengthi5e4:pathl5:c.bineee4:name3:dir12:piece lengthi16384eee",
        );
        assert_eq!(
            meta.file_info,
            vec![
                FileInfo {
                    path: "a/b.txt".to_string(),
                    length: 10
                },
                FileInfo {
                    path: "c.bin".to_string(),
                    length: 5
                },
            ]
        );
        assert_eq!(meta.name, "dir");
        assert_eq!(meta.piece_length, 16384);
        assert_eq!(meta.total_length(), 15);
        assert!(meta.is_multi_file());
    }

    #[test]
    fn test_top_level_fields() {
        let meta = metadata(
            b"d8:announce4:url113:announce-listll4:url1el4:url24:url3ee7:comment2:hi10:created by4:mktr13:creation datei1700000000e8:encoding5:UTF-8e",
        );
        assert_eq!(meta.announce, "url1");
        assert_eq!(meta.announce_list, vec!["url1", "url2", "url3"]);
        assert_eq!(meta.comment, "hi");
        assert_eq!(meta.created_by, "mktr");
        assert_eq!(meta.creation_date, 1_700_000_000);
        assert_eq!(meta.encoding, "UTF-8");
    }

    #[test]
    fn test_announce_list_tier_shapes() {
        // A bare-string tier, a tier with a non-string URL, and integer/dict tiers.
        let meta = metadata(b"d13:announce-listl4:url1l4:url2i7e4:url3ei9edel4:url4eee");
        assert_eq!(meta.announce_list, vec!["url1", "url2", "url3", "url4"]);
    }

    #[test]
    fn test_single_file_name_with_slash() {
        let meta = metadata(b"d4:infod6:lengthi5e4:name5:a/b/cee");
        assert!(!meta.is_multi_file());

        let meta = metadata(b"d4:infod5:filesld6:lengthi1e4:pathl1:xeee4:name1:nee");
        assert!(meta.is_multi_file());
        assert_eq!(meta.file_info.len(), 1);
    }

    #[test]
    fn test_total_length_saturates() {
        let meta = metadata(
            b"d4:infod5:filesld6:lengthi9223372036854775807e4:pathl1:aeed6:lengthi1e4:pathl1:beee4:name1:nee",
        );
        assert_eq!(meta.total_length(), i64::MAX);
        assert!(meta.to_string().ends_with("Total Length: 9223372036854775807"));
    }

    #[test]
    fn test_missing_keys_give_defaults() {
        let meta = extract_metadata(&Dictionary::new());
        assert_eq!(meta, Metadata::default());
        assert!(meta.name.is_empty() && meta.announce.is_empty() && meta.comment.is_empty());
        assert_eq!(meta.creation_date, 0);
        assert_eq!(meta.piece_length, 0);
        assert!(meta.announce_list.is_empty());
        assert!(meta.pieces.is_empty());
        assert!(meta.file_info.is_empty());
        assert!(meta.raw_info_dict.is_empty());
    }

    #[test]
    fn test_mistyped_keys_give_defaults() {
        let meta = metadata(
            b"d8:announcei5e13:announce-list3:url13:creation date3:now4:infoli1eee",
        );
        assert_eq!(meta.announce, "");
        assert!(meta.announce_list.is_empty());
        assert_eq!(meta.creation_date, 0);
        assert!(meta.file_info.is_empty());
    }

    #[test]
    fn test_tolerant_files_entries() {
        let meta = metadata(b"d4:infod5:filesli7ed4:pathl1:xeed6:lengthi3eeeee");
        assert_eq!(
            meta.file_info,
            vec![
                FileInfo {
                    path: "x".to_string(),
                    length: 0
                },
                FileInfo {
                    path: String::new(),
                    length: 3
                },
            ]
        );
    }

    #[test]
    fn test_raw_info_dict_is_byte_exact() {
        // Keys deliberately out of sorted order.
        let input = b"d4:infod4:name1:n6:lengthi1e6:pieces3:\x00e\xffe8:announce1:ue";
        let meta = metadata(input);
        assert_eq!(meta.info_bytes(), &b"d4:name1:n6:lengthi1e6:pieces3:\x00e\xffe"[..]);
        assert_eq!(meta.pieces, vec![0x00, b'e', 0xff]);
    }

    #[test]
    fn test_piece_hashes() {
        let meta = Metadata {
            pieces: (0u8..45).collect(),
            ..Metadata::default()
        };
        let hashes: Vec<[u8; 20]> = meta.piece_hashes().collect();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[1][0], 20);
        assert_eq!(meta.piece_count(), 2);
    }

    #[test]
    fn test_serialize_json() {
        let meta = metadata(b"d4:infod6:lengthi1e4:name1:a6:pieces2:\xab\xcdee");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["pieces"], "abcd");
        assert_eq!(json["file_info"][0]["path"], "a");
        assert!(json.get("raw_info_dict").is_none());
    }

    #[test]
    fn test_display() {
        let meta = metadata(b"d8:announce3:xxx4:infod6:lengthi100e4:name4:testee");
        let shown = meta.to_string();
        assert!(shown.contains("Tracker URL: xxx"));
        assert!(shown.contains("  test (100 bytes)"));
        assert!(shown.ends_with("Total Length: 100"));
    }
}
