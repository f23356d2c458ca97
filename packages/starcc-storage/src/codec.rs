//! Fixed-width binary record codecs.
//!
//! All integers are 4-byte big-endian (Java `DataOutput` layout), so record
//! sets can be exchanged with JVM tooling.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use crate::{Result, StorageError};

/// Node identifier. Non-negative in every valid graph.
pub type NodeId = i32;

/// Reserved neighbor value: the node has no neighbor (isolated).
pub const NO_NEIGHBOR: NodeId = -1;

/// A record type that can live in a record set.
pub trait RecordCodec: Sized {
    /// Short name used in error messages.
    const NAME: &'static str;

    /// Append the wire form of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Decode every record contained in `bytes`.
    fn decode_all(bytes: &[u8]) -> Result<Vec<Self>>;

    fn encode_all(records: &[Self]) -> Vec<u8> {
        let mut out = Vec::new();
        for record in records {
            record.encode(&mut out);
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Edge
// ═══════════════════════════════════════════════════════════════════════════

/// Edge `(node, neighbor)`; `neighbor == NO_NEIGHBOR` marks an isolated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub node: NodeId,
    pub neighbor: NodeId,
}

impl EdgeRecord {
    pub const WIDTH: usize = 8;

    pub fn new(node: NodeId, neighbor: NodeId) -> Self {
        Self { node, neighbor }
    }

    pub fn isolated(node: NodeId) -> Self {
        Self::new(node, NO_NEIGHBOR)
    }

    pub fn is_isolated(&self) -> bool {
        self.neighbor == NO_NEIGHBOR
    }
}

impl RecordCodec for EdgeRecord {
    const NAME: &'static str = "edge";

    fn encode(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; Self::WIDTH];
        BigEndian::write_i32(&mut buf[..4], self.node);
        BigEndian::write_i32(&mut buf[4..], self.neighbor);
        out.extend_from_slice(&buf);
    }

    fn decode_all(bytes: &[u8]) -> Result<Vec<Self>> {
        if bytes.len() % Self::WIDTH != 0 {
            return Err(StorageError::codec(format!(
                "edge record set has {} bytes, not a multiple of {}",
                bytes.len(),
                Self::WIDTH
            )));
        }
        Ok(bytes
            .chunks_exact(Self::WIDTH)
            .map(|chunk| {
                EdgeRecord::new(
                    BigEndian::read_i32(&chunk[..4]),
                    BigEndian::read_i32(&chunk[4..]),
                )
            })
            .collect())
    }
}

impl fmt::Display for EdgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.node, self.neighbor)
    }
}

impl FromStr for EdgeRecord {
    type Err = StorageError;

    /// Parses the text form `node<TAB>neighbor`.
    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.trim().split('\t');
        let (node, neighbor) = match (fields.next(), fields.next(), fields.next()) {
            (Some(node), Some(neighbor), None) => (node, neighbor),
            _ => {
                return Err(StorageError::codec(format!(
                    "expected 'node<TAB>neighbor', got '{}'",
                    s
                )))
            }
        };
        Ok(EdgeRecord::new(parse_id(node)?, parse_id(neighbor)?))
    }
}

fn parse_id(token: &str) -> Result<NodeId> {
    token
        .trim()
        .parse::<NodeId>()
        .map_err(|e| StorageError::codec(format!("invalid node id '{}': {}", token, e)))
}

// ═══════════════════════════════════════════════════════════════════════════
// Cluster
// ═══════════════════════════════════════════════════════════════════════════

/// A materialized connected component, members in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub members: Vec<NodeId>,
}

impl ClusterRecord {
    /// Wraps members that are already sorted ascending.
    pub fn new(members: Vec<NodeId>) -> Self {
        Self { members }
    }

    /// Sorts and deduplicates `members`.
    pub fn from_unsorted(mut members: Vec<NodeId>) -> Self {
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    /// Identifying key: the minimum member.
    pub fn representative(&self) -> Option<NodeId> {
        self.members.first().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.binary_search(&node).is_ok()
    }
}

impl RecordCodec for ClusterRecord {
    const NAME: &'static str = "cluster";

    fn encode(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, self.members.len() as i32);
        out.extend_from_slice(&buf);
        for &member in &self.members {
            BigEndian::write_i32(&mut buf, member);
            out.extend_from_slice(&buf);
        }
    }

    fn decode_all(bytes: &[u8]) -> Result<Vec<Self>> {
        let mut cursor = Cursor::new(bytes);
        let mut clusters = Vec::new();

        while (cursor.position() as usize) < bytes.len() {
            let count = cursor
                .read_i32::<BigEndian>()
                .map_err(|e| StorageError::codec("truncated cluster header").with_source(e))?;
            if count < 0 {
                return Err(StorageError::codec(format!(
                    "negative cluster size {} at offset {}",
                    count,
                    cursor.position() - 4
                )));
            }

            let remaining = bytes.len() - cursor.position() as usize;
            if remaining < count as usize * 4 {
                return Err(StorageError::codec(format!(
                    "cluster declares {} members but only {} bytes remain",
                    count, remaining
                )));
            }

            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                members.push(
                    cursor
                        .read_i32::<BigEndian>()
                        .map_err(|e| StorageError::codec("truncated cluster body").with_source(e))?,
                );
            }
            clusters.push(ClusterRecord::new(members));
        }

        Ok(clusters)
    }
}

impl fmt::Display for ClusterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for member in &self.members {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", member)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for ClusterRecord {
    type Err = StorageError;

    /// Parses the text form: space-separated node ids.
    fn from_str(s: &str) -> Result<Self> {
        let members = s
            .split_whitespace()
            .map(parse_id)
            .collect::<Result<Vec<_>>>()?;
        Ok(ClusterRecord::from_unsorted(members))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Text line
// ═══════════════════════════════════════════════════════════════════════════

/// One line of raw text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine(pub String);

impl TextLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RecordCodec for TextLine {
    const NAME: &'static str = "text";

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.as_bytes());
        out.push(b'\n');
    }

    fn decode_all(bytes: &[u8]) -> Result<Vec<Self>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::codec("input is not valid UTF-8").with_source(e))?;
        Ok(text.lines().map(|line| TextLine(line.to_string())).collect())
    }
}
