//! AML names.
//!
//! On the wire a NameString is an optional root (`\`) or parent (`^`) prefix
//! followed by a NamePath: NullName (`0x00`), one NameSeg, a DualNamePath
//! (`0x2E` + 2 segments) or a MultiNamePath (`0x2F` + count + segments).
//!
//! [`NameStr`] validates encoded bytes in place and takes every length the
//! encoding allows. [`NameString`] and [`AmlPath`] keep their segments inline
//! and stop at [`MAX_PATH_DEPTH`].

use alloc::vec::Vec;
use core::fmt::{self, Write};

use crate::AmlError;

/// Root prefix character (`\`).
pub const ROOT_CHAR: u8 = b'\\';
/// Parent prefix character (`^`).
pub const PARENT_PREFIX_CHAR: u8 = b'^';
/// NullName: an empty NamePath.
pub const NULL_NAME: u8 = 0x00;
/// DualNamePath prefix.
pub const DUAL_NAME_PREFIX: u8 = 0x2E;
/// MultiNamePath prefix.
pub const MULTI_NAME_PREFIX: u8 = 0x2F;

/// Most segments an [`AmlPath`] or [`NameString`] can hold.
pub const MAX_PATH_DEPTH: usize = 16;

/// Returns `true` for bytes that may start a NameSeg.
#[must_use]
pub const fn is_lead_name_char(byte: u8) -> bool {
    matches!(byte, b'A'..=b'Z' | b'_')
}

/// Returns `true` for bytes that may appear after the first NameSeg byte.
#[must_use]
pub const fn is_name_char(byte: u8) -> bool {
    is_lead_name_char(byte) || byte.is_ascii_digit()
}

/// Returns `true` for bytes that start a NameString in term position.
#[must_use]
pub const fn starts_name_string(byte: u8) -> bool {
    is_lead_name_char(byte)
        || matches!(
            byte,
            ROOT_CHAR | PARENT_PREFIX_CHAR | DUAL_NAME_PREFIX | MULTI_NAME_PREFIX
        )
}

/// Writes a name in ASL notation: prefixes, then dot-separated segments.
fn write_asl(
    f: &mut fmt::Formatter<'_>,
    root: bool,
    parent_prefixes: u8,
    segments: impl Iterator<Item = NameSeg>,
) -> fmt::Result {
    if root {
        f.write_char('\\')?;
    }
    for _ in 0..parent_prefixes {
        f.write_char('^')?;
    }
    for (i, seg) in segments.enumerate() {
        if i > 0 {
            f.write_char('.')?;
        }
        f.write_str(seg.as_str())?;
    }
    Ok(())
}

/// One four-character name segment, such as `_SB_` or `PCI0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSeg(pub [u8; 4]);

impl NameSeg {
    /// Reads a segment from the first four bytes of `bytes`.
    ///
    /// `None` when fewer than four bytes remain or they are not name
    /// characters.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (seg, _) = bytes.split_first_chunk::<4>()?;
        let valid = is_lead_name_char(seg[0]) && seg[1..].iter().all(|&b| is_name_char(b));
        valid.then_some(Self(*seg))
    }

    /// Builds a segment from ASL text, padding names shorter than four
    /// characters with `_` (`"PCI"` becomes `PCI_`).
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for empty or over-long text or
    /// characters outside `A-Z`, `0-9`, `_`.
    pub fn from_asl(text: &str) -> Result<Self, AmlError> {
        let bytes = text.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(AmlError::InvalidArgument);
        }
        let mut seg = [b'_'; 4];
        seg[..bytes.len()].copy_from_slice(bytes);
        Self::from_bytes(&seg).ok_or(AmlError::InvalidArgument)
    }

    /// The segment as text; empty if the raw bytes are not ASCII.
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NameSeg").field(&self.as_str()).finish()
    }
}

impl fmt::Display for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ─── Resolved paths ────────────────────────────────────────────────────────

/// An absolute namespace path of at most [`MAX_PATH_DEPTH`] segments.
#[derive(Clone, Copy)]
pub struct AmlPath {
    segments: [NameSeg; MAX_PATH_DEPTH],
    depth: u8,
}

impl AmlPath {
    /// `\`
    pub const ROOT: Self = Self {
        segments: [NameSeg(*b"____"); MAX_PATH_DEPTH],
        depth: 0,
    };

    /// This path extended by `seg`, or `None` when it is already full.
    #[must_use]
    pub fn child(mut self, seg: NameSeg) -> Option<Self> {
        *self.segments.get_mut(usize::from(self.depth))? = seg;
        self.depth += 1;
        Some(self)
    }

    /// The enclosing path, or `None` for `\`.
    #[must_use]
    pub fn parent(mut self) -> Option<Self> {
        self.depth = self.depth.checked_sub(1)?;
        Some(self)
    }

    /// Segments from the root down.
    #[must_use]
    pub fn segments(&self) -> &[NameSeg] {
        &self.segments[..usize::from(self.depth)]
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        usize::from(self.depth)
    }

    /// Resolves `name` relative to this scope.
    ///
    /// Returns `None` when the name climbs above the root or the result
    /// would be deeper than [`MAX_PATH_DEPTH`]. ACPI search rules for
    /// single-segment names are not applied.
    #[must_use]
    pub fn resolve(&self, name: &NameString) -> Option<Self> {
        let mut path = if name.root { Self::ROOT } else { *self };
        for _ in 0..name.parent_prefixes {
            path = path.parent()?;
        }
        name.segments().iter().try_fold(path, |path, &seg| path.child(seg))
    }
}

impl PartialEq for AmlPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments() == other.segments()
    }
}

impl Eq for AmlPath {}

impl fmt::Debug for AmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AmlPath").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for AmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_asl(f, true, 0, self.segments().iter().copied())
    }
}

// ─── Name strings ──────────────────────────────────────────────────────────

/// An owned name, relative or absolute, of at most [`MAX_PATH_DEPTH`]
/// segments.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NameString {
    /// The name starts with the root prefix (`\`).
    pub root: bool,
    /// Number of parent prefixes (`^`). Always zero when `root` is set.
    pub parent_prefixes: u8,
    // Only the segments are used; the path is never treated as absolute.
    path: AmlPath,
}

impl NameString {
    /// The name segments, without prefixes.
    #[must_use]
    pub fn segments(&self) -> &[NameSeg] {
        self.path.segments()
    }

    /// The last segment, i.e. the object's own name.
    #[must_use]
    pub fn last_segment(&self) -> Option<NameSeg> {
        self.segments().last().copied()
    }

    /// Returns `true` for a lone NameSeg with no prefix.
    #[must_use]
    pub fn is_single_segment(&self) -> bool {
        !self.root && self.parent_prefixes == 0 && self.segments().len() == 1
    }

    /// Parses ASL notation: `\_SB.PCI0`, `^^FOO`, `DEV`, or `\` alone.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for malformed text or more than
    /// [`MAX_PATH_DEPTH`] segments.
    pub fn from_asl(text: &str) -> Result<Self, AmlError> {
        let mut name = Self {
            root: false,
            parent_prefixes: 0,
            path: AmlPath::ROOT,
        };
        let mut rest = text;
        if let Some(stripped) = rest.strip_prefix('\\') {
            name.root = true;
            rest = stripped;
        } else {
            while let Some(stripped) = rest.strip_prefix('^') {
                name.parent_prefixes = name
                    .parent_prefixes
                    .checked_add(1)
                    .ok_or(AmlError::InvalidArgument)?;
                rest = stripped;
            }
        }
        if !rest.is_empty() {
            for part in rest.split('.') {
                let seg = NameSeg::from_asl(part)?;
                name.path = name.path.child(seg).ok_or(AmlError::InvalidArgument)?;
            }
        }
        Ok(name)
    }

    /// Encodes this name in AML wire format.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let segments = self.segments();
        let prefixes = usize::from(self.root) + usize::from(self.parent_prefixes);
        let mut out = Vec::with_capacity(prefixes + 2 + segments.len() * 4);
        if self.root {
            out.push(ROOT_CHAR);
        }
        out.extend(core::iter::repeat_n(PARENT_PREFIX_CHAR, usize::from(self.parent_prefixes)));
        match segments.len() {
            0 => out.push(NULL_NAME),
            1 => {}
            2 => out.push(DUAL_NAME_PREFIX),
            n => {
                out.push(MULTI_NAME_PREFIX);
                // n <= MAX_PATH_DEPTH
                out.push(u8::try_from(n).unwrap_or(u8::MAX));
            }
        }
        for seg in segments {
            out.extend_from_slice(&seg.0);
        }
        out
    }
}

impl fmt::Debug for NameString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NameString").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for NameString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_asl(f, self.root, self.parent_prefixes, self.segments().iter().copied())
    }
}

/// A validated NameString borrowed from encoded AML.
///
/// A MultiNamePath may carry up to 255 segments, all of which are accepted
/// here.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NameStr<'a> {
    /// The name starts with the root prefix (`\`).
    pub root: bool,
    /// Number of parent prefixes (`^`).
    pub parent_prefixes: u8,
    segments: &'a [u8],
}

impl<'a> NameStr<'a> {
    /// Decodes the NameString at the start of `bytes`, returning it with its
    /// encoded length.
    #[must_use]
    pub fn decode_prefix(bytes: &'a [u8]) -> Option<(Self, usize)> {
        let root = bytes.first() == Some(&ROOT_CHAR);
        let mut pos = usize::from(root);
        let mut parent_prefixes = 0u8;
        while !root && bytes.get(pos) == Some(&PARENT_PREFIX_CHAR) {
            parent_prefixes = parent_prefixes.checked_add(1)?;
            pos += 1;
        }

        let (count, header) = match *bytes.get(pos)? {
            NULL_NAME => (0, 1),
            DUAL_NAME_PREFIX => (2, 1),
            MULTI_NAME_PREFIX => (usize::from(*bytes.get(pos + 1)?), 2),
            lead if is_lead_name_char(lead) => (1, 0),
            _ => return None,
        };
        let start = pos + header;
        let end = start + count * 4;
        let segments = bytes.get(start..end)?;
        if !segments.chunks_exact(4).all(|seg| NameSeg::from_bytes(seg).is_some()) {
            return None;
        }
        let name = Self {
            root,
            parent_prefixes,
            segments,
        };
        Some((name, end))
    }

    /// Decodes a NameString that occupies all of `bytes`.
    #[must_use]
    pub fn decode(bytes: &'a [u8]) -> Option<Self> {
        let (name, len) = Self::decode_prefix(bytes)?;
        (len == bytes.len()).then_some(name)
    }

    /// The name segments, without prefixes.
    pub fn segments(self) -> impl Iterator<Item = NameSeg> + 'a {
        self.segments.chunks_exact(4).filter_map(NameSeg::from_bytes)
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len() / 4
    }

    /// The last segment, i.e. the object's own name.
    #[must_use]
    pub fn last_segment(&self) -> Option<NameSeg> {
        self.segments.rchunks_exact(4).next().and_then(NameSeg::from_bytes)
    }

    /// Copies the name into a [`NameString`], or `None` if it has more than
    /// [`MAX_PATH_DEPTH`] segments.
    #[must_use]
    pub fn to_name_string(&self) -> Option<NameString> {
        let path = self.segments().try_fold(AmlPath::ROOT, AmlPath::child)?;
        Some(NameString {
            root: self.root,
            parent_prefixes: self.parent_prefixes,
            path,
        })
    }
}

impl fmt::Debug for NameStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NameStr").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for NameStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_asl(f, self.root, self.parent_prefixes, self.segments())
    }
}
