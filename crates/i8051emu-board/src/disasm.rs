use i8051emu_core::{DisassembleError, Disassembler, InstructionRow};

use crate::hex::{Image, ImageError, ImageFormat};
use crate::isa::{Instruction, length};

/// Linear-sweep disassembler over the data runs of an image.
///
/// Each contiguous run is decoded from its first byte. A trailing
/// instruction that would run past the end of its run is listed byte by byte
/// as `DB` rows instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dsm51Disassembler {
    format: ImageFormat,
}

impl Dsm51Disassembler {
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }
}

impl Disassembler for Dsm51Disassembler {
    fn disassemble(&self, image: &[u8]) -> Result<Vec<InstructionRow>, DisassembleError> {
        let image = Image::parse(image, self.format).map_err(|e| match e {
            ImageError::Empty => DisassembleError::Empty,
            e => DisassembleError::Image(e.to_string()),
        })?;

        let mut rows = Vec::new();
        for (start, run) in image.runs() {
            let mut offset = 0;
            while offset < run.len() {
                let address = start.wrapping_add(offset as u16);
                let len = length(run[offset]) as usize;
                if offset + len > run.len() {
                    for (i, byte) in run[offset..].iter().enumerate() {
                        rows.push(InstructionRow::new(
                            address.wrapping_add(i as u16),
                            vec![*byte],
                            format!("DB {byte:X}h"),
                        ));
                    }
                    break;
                }
                let bytes = &run[offset..offset + len];
                let mut raw = [0; 3];
                raw[..len].copy_from_slice(bytes);
                let instruction = Instruction::new(address, raw);
                rows.push(InstructionRow::new(
                    address,
                    bytes.to_vec(),
                    instruction.mnemonic(),
                ));
                offset += len;
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_tail_becomes_data_rows() {
        let rows = Dsm51Disassembler::new(ImageFormat::Binary)
            .disassemble(&[0x00, 0x02, 0x12])
            .unwrap();
        let listing: Vec<_> = rows.iter().map(|r| (r.address, r.mnemonic.as_str())).collect();
        assert_eq!(listing, vec![(0, "NOP"), (1, "DB 2h"), (2, "DB 12h")]);
    }

    #[test]
    fn empty_and_malformed_images() {
        let disasm = Dsm51Disassembler::default();
        assert_eq!(disasm.disassemble(b""), Err(DisassembleError::Empty));
        assert!(matches!(
            disasm.disassemble(b":03000000020100FB\n"),
            Err(DisassembleError::Image(_))
        ));
    }
}
