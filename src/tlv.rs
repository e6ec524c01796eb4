//! A minimal BER-TLV tag/length/value package: an ordered, append-only list
//! of `(tag, value)` pairs, as used by EMV-adjacent data. Not invoked by the
//! sale/key-init/token handlers directly, but part of the data model this
//! acquirer simulator exposes for terminals that submit or expect
//! EMV-style TLV blobs.

/// One TLV entry: an integer tag and its raw value bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    pub tag: u32,
    pub value: Vec<u8>,
}

/// An ordered, append-only list of TLV entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlvPackage {
    entries: Vec<Tlv>,
}

impl TlvPackage {
    pub fn new() -> TlvPackage {
        TlvPackage { entries: Vec::new() }
    }

    pub fn push(&mut self, tag: u32, value: Vec<u8>) {
        self.entries.push(Tlv { tag, value });
    }

    pub fn entries(&self) -> &[Tlv] {
        &self.entries
    }

    fn encode_tag(tag: u32, out: &mut Vec<u8>) {
        if tag <= 0xFF {
            out.push(tag as u8);
        } else {
            let bytes = tag.to_be_bytes();
            let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
            out.extend_from_slice(&significant);
        }
    }

    fn encode_len(len: usize, out: &mut Vec<u8>) {
        if len <= 127 {
            out.push(len as u8);
        } else {
            let bytes = len.to_be_bytes();
            let significant: Vec<u8> = bytes
                .iter()
                .copied()
                .skip_while(|&b| b == 0)
                .collect();
            out.push(0x80 | significant.len() as u8);
            out.extend_from_slice(&significant);
        }
    }

    /// Serialize every entry in insertion order: tag (1 byte, or 4
    /// big-endian bytes if `tag > 0xFF`), BER-TLV length, then value bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            Self::encode_tag(entry.tag, &mut out);
            Self::encode_len(entry.value.len(), &mut out);
            out.extend_from_slice(&entry.value);
        }
        out
    }
}
