use anyhow::Result;
use std::path::Path;

use byteforge_asm::disasm::{decode_at, Decoded};

/// Flat bytecode image. The VM fetches from offset 0 of its program buffer,
/// so `base` only shifts the addresses shown to the user.
#[derive(Debug, Clone)]
pub struct Image {
    pub base: usize,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn new(base: usize, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    /// One past the last mapped address, saturating at the top of the address space.
    pub fn end(&self) -> usize {
        self.base.saturating_add(self.bytes.len())
    }

    pub fn is_mapped(&self, addr: usize) -> bool {
        addr >= self.base && addr - self.base < self.bytes.len()
    }
}

pub fn load_raw_bin(path: &Path, base: usize, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(
        base.checked_add(payload.len()).is_some(),
        "--base {base:#x} plus image length overflows the address space"
    );
    Ok(Image::new(base, payload.to_vec()))
}

pub fn read_u8(img: &Image, addr: usize) -> Option<u8> {
    if !img.is_mapped(addr) {
        return None;
    }
    img.bytes.get(addr - img.base).copied()
}

/// Decode the instruction at `addr`; the returned offset is image-absolute.
pub fn decode(img: &Image, addr: usize) -> Option<Decoded> {
    if !img.is_mapped(addr) {
        return None;
    }
    let mut d = decode_at(&img.bytes, addr - img.base).ok()?;
    d.offset = addr;
    Some(d)
}
