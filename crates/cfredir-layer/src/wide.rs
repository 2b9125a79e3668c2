//! UTF-16 path buffers and the lexical path tests the policy relies on.
//!
//! Everything here is pure: no file-system access, no environment lookups.

use std::fmt;

const BACKSLASH: u16 = b'\\' as u16;
const SLASH: u16 = b'/' as u16;
const COLON: u16 = b':' as u16;
const DOT: u16 = b'.' as u16;
const SPACE: u16 = b' ' as u16;

/// Owned, NUL-terminated UTF-16 string with no interior NULs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WideString {
    // Always ends with exactly one 0.
    units: Vec<u16>,
}

impl WideString {
    /// Build from code units that do not include the terminator.
    /// Returns None on an interior NUL.
    pub fn from_units(units: &[u16]) -> Option<Self> {
        if units.contains(&0) {
            return None;
        }
        let mut buf = Vec::with_capacity(units.len() + 1);
        buf.extend_from_slice(units);
        buf.push(0);
        Some(Self { units: buf })
    }

    pub fn encode(s: &str) -> Option<Self> {
        let units: Vec<u16> = s.encode_utf16().collect();
        Self::from_units(&units)
    }

    /// Copy a caller-owned, NUL-terminated string.
    ///
    /// # Safety
    /// `ptr` must be null or point to a readable NUL-terminated UTF-16 string.
    pub unsafe fn from_ptr(ptr: *const u16) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        let len = wcslen(ptr);
        Self::from_units(std::slice::from_raw_parts(ptr, len))
    }

    /// Code units without the terminator.
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.units.len() - 1]
    }

    /// Pointer to the NUL-terminated buffer, valid while `self` lives.
    pub fn as_ptr(&self) -> *const u16 {
        self.units.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.units.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// New string with `prefix` in front of this one.
    pub fn with_prefix(&self, prefix: &[u16]) -> Option<Self> {
        let mut buf = Vec::with_capacity(prefix.len() + self.units.len());
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(self.as_units());
        Self::from_units(&buf)
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_units())
    }
}

impl fmt::Debug for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Length of a NUL-terminated UTF-16 string, in code units.
///
/// # Safety
/// `ptr` must point to a readable NUL-terminated UTF-16 string.
pub unsafe fn wcslen(ptr: *const u16) -> usize {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    len
}

pub fn is_separator(unit: u16) -> bool {
    unit == BACKSLASH || unit == SLASH
}

/// Simple per-unit uppercase fold, the same granularity the object manager
/// uses for case-insensitive names. Surrogates compare exactly.
fn fold(unit: u16) -> u16 {
    if unit < 0x80 {
        return (unit as u8).to_ascii_uppercase() as u16;
    }
    let Some(c) = char::from_u32(unit as u32) else {
        return unit;
    };
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) if (u as u32) <= 0xFFFF => u as u32 as u16,
        _ => unit,
    }
}

pub fn eq_ignore_case(a: &[u16], b: &[u16]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| x == y || fold(x) == fold(y))
}

/// True for anything starting with two separators: `\\server\share`,
/// `\\?\...`, `\\.\...` and their forward-slash spellings.
pub fn has_unc_shape(path: &[u16]) -> bool {
    matches!(path, [a, b, ..] if is_separator(*a) && is_separator(*b))
}

/// True for `X:\` paths the legacy layer would pass through without any
/// rewriting: backslashes only, no empty, `.` or `..` components, and no
/// component ending in a dot or space (those are silently stripped by the
/// legacy layer but not by the native one).
pub fn is_plain_local_path(path: &[u16]) -> bool {
    let [drive, COLON, BACKSLASH, rest @ ..] = path else {
        return false;
    };
    if !(*drive < 0x80 && (*drive as u8).is_ascii_alphabetic()) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    if rest.contains(&SLASH) || rest.contains(&COLON) {
        return false;
    }
    let components: Vec<&[u16]> = rest.split(|&u| u == BACKSLASH).collect();
    let last = components.len() - 1;
    components.iter().enumerate().all(|(i, component)| match component {
        [] => i == last,
        [DOT] | [DOT, DOT] => false,
        [.., end] => *end != DOT && *end != SPACE,
    })
}

/// Case-insensitive containment: `path` is `root`, a separator, then at
/// least one more non-separator unit. The root itself is not contained.
pub fn is_strict_descendant(root: &[u16], path: &[u16]) -> bool {
    let root = trim_trailing_separators(root);
    if root.is_empty() || path.len() <= root.len() + 1 {
        return false;
    }
    let (head, tail) = path.split_at(root.len());
    eq_ignore_case(head, root) && is_separator(tail[0]) && tail[1..].iter().any(|&u| !is_separator(u))
}

pub fn trim_trailing_separators(mut path: &[u16]) -> &[u16] {
    while let [rest @ .., last] = path {
        if !is_separator(*last) {
            break;
        }
        path = rest;
    }
    path
}
