// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Deterministic naming for every shared object the bridge creates.
// All names derive from the session token (the value the worker receives
// as `--ppid`) plus a fixed purpose suffix, so a worker launched with the
// matching token can locate the same segments without any side channel.

/// FNV-1a 64-bit hash, used to shorten names on platforms with tight
/// shm name limits.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in data {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Convert a 64-bit value to a fixed-width 16-char lowercase hex string.
fn to_hex(val: u64) -> [u8; 16] {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut buf = [0u8; 16];
    let mut v = val;
    for i in (0..16).rev() {
        buf[i] = DIGITS[(v & 0xf) as usize];
        v >>= 4;
    }
    buf
}

/// Maximum length for POSIX shm names. Set to 0 to disable truncation.
///
/// On macOS `PSHMNAMLEN` is 31. On Linux the limit is typically 255.
#[cfg(target_os = "macos")]
pub const SHM_NAME_MAX: usize = 31;

#[cfg(not(target_os = "macos"))]
pub const SHM_NAME_MAX: usize = 0; // 0 = no truncation

/// Produce a POSIX shm-safe name (with leading '/').
///
/// When `SHM_NAME_MAX > 0`, names whose POSIX form (including the leading '/')
/// would exceed that limit are shortened to:
///     `/<prefix>_<16-hex-FNV-1a-hash>`
/// where `<prefix>` is a truncated portion of the original name for
/// debuggability.
pub fn make_shm_name(name: &str) -> String {
    let result = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    };

    if SHM_NAME_MAX == 0 {
        return result;
    }

    if result.len() <= SHM_NAME_MAX {
        return result;
    }

    // 1 (underscore) + 16 (hex hash)
    const HASH_SUFFIX_LEN: usize = 1 + 16;
    let prefix_len = if SHM_NAME_MAX > HASH_SUFFIX_LEN + 1 {
        SHM_NAME_MAX - HASH_SUFFIX_LEN - 1 // -1 for leading '/'
    } else {
        0
    };

    let hash = fnv1a_64(result.as_bytes());
    let hex = to_hex(hash);
    let hex_str = std::str::from_utf8(&hex).unwrap();

    let mut shortened = String::with_capacity(SHM_NAME_MAX);
    shortened.push('/');
    if prefix_len > 0 {
        // Skip the leading '/' of the original, take prefix_len bytes
        let original_body = &result[1..];
        let take = prefix_len.min(original_body.len());
        shortened.push_str(&original_body[..take]);
    }
    shortened.push('_');
    shortened.push_str(hex_str);
    shortened
}

// ---------------------------------------------------------------------------
// Purpose suffixes
// ---------------------------------------------------------------------------

/// Role of a shared memory segment within one supervised session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPurpose {
    /// The `SharedMessage` handshake record.
    Message,
    /// The `SharedParams` filter configuration record.
    Params,
    /// One input frame slot (index within the session).
    Frame(u32),
}

/// Name of a shared memory segment for `session`.
pub fn segment_name(session: u32, purpose: SegmentPurpose) -> String {
    match purpose {
        SegmentPurpose::Message => format!("fbridge_{session:08x}_mes"),
        SegmentPurpose::Params => format!("fbridge_{session:08x}_prm"),
        SegmentPurpose::Frame(n) => format!("fbridge_{session:08x}_frame{n}"),
    }
}

/// Which handshake event a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Host → worker: a request is pending.
    Start,
    /// Worker → host: the request is done.
    End,
}

/// Name of a handshake event for `session`.
pub fn event_name(session: u32, kind: EventKind) -> String {
    match kind {
        EventKind::Start => format!("fbridge_{session:08x}_evt_start"),
        EventKind::End => format!("fbridge_{session:08x}_evt_end"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_value() {
        // FNV-1a of empty string
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
    }

    #[test]
    fn make_shm_name_prepends_slash() {
        let name = make_shm_name("foo");
        assert!(name.starts_with('/'));
        assert!(name.contains("foo"));
    }

    #[test]
    fn make_shm_name_keeps_existing_slash() {
        let name = make_shm_name("/bar");
        assert_eq!(&name[..4], "/bar");
    }

    #[test]
    fn to_hex_roundtrip() {
        let hex = to_hex(0x0123456789abcdef);
        assert_eq!(&hex, b"0123456789abcdef");
    }

    #[test]
    fn segment_names_unique_per_purpose() {
        let s = 0x1234u32;
        let names = [
            segment_name(s, SegmentPurpose::Message),
            segment_name(s, SegmentPurpose::Params),
            segment_name(s, SegmentPurpose::Frame(0)),
            segment_name(s, SegmentPurpose::Frame(1)),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn segment_names_unique_per_session() {
        assert_ne!(
            segment_name(1, SegmentPurpose::Message),
            segment_name(2, SegmentPurpose::Message)
        );
        assert_ne!(
            event_name(1, EventKind::Start),
            event_name(2, EventKind::Start)
        );
    }
}
