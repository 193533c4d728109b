//! x86 stub assembler.
//!
//! The only place in the crate that produces machine code. It knows the
//! handful of 32-bit instruction forms the injected stubs and detours need
//! and nothing else.
//!
//! # Encodings
//!
//! ```text
//! mov r32, imm32        B8+r id
//! mov r32, r/m32        8B /r
//! push r32 / pop r32    50+r / 58+r
//! cmp r/m32, r32        39 /r
//! call r/m32            FF /2
//! jmp rel32             E9 cd
//! je rel32              0F 84 cd
//! ret                   C3
//! nop                   90
//! ```

use crate::error::{Error, Result};

/// General purpose registers usable as operands.
///
/// `esp` and `ebp` are left out: as memory bases they need SIB or forced
/// displacement encodings the stubs never use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Eax,
    Ecx,
    Edx,
    Ebx,
    Esi,
    Edi,
}

impl Reg {
    fn code(self) -> u8 {
        match self {
            Reg::Eax => 0,
            Reg::Ecx => 1,
            Reg::Edx => 2,
            Reg::Ebx => 3,
            Reg::Esi => 6,
            Reg::Edi => 7,
        }
    }
}

/// A memory or register operand for the `r/m32` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    /// `[disp32]`
    Absolute(u32),
    /// `[reg]`
    Indirect(Reg),
    /// `[reg + disp8]`
    Disp8(Reg, i8),
    /// `[reg + disp32]`
    Disp32(Reg, i32),
}

fn modrm(mode: u8, reg: u8, rm: u8) -> u8 {
    (mode << 6) | (reg << 3) | rm
}

/// A forward or backward branch target inside one stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Assembles a stub that will live at a known address in the target.
///
/// Relative branches are computed against `origin`, so the bytes are only
/// valid at that address.
#[derive(Debug)]
pub struct StubBuilder {
    origin: u32,
    code: Vec<u8>,
    labels: Vec<Option<usize>>,
    /// (position of rel32 field, label)
    fixups: Vec<(usize, Label)>,
}

impl StubBuilder {
    pub fn new(origin: u32) -> Self {
        Self {
            origin,
            code: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
        }
    }

    /// Address the next emitted byte will occupy.
    pub fn position(&self) -> u32 {
        self.origin.wrapping_add(self.code.len() as u32)
    }

    fn emit(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    fn emit_operand(&mut self, reg_field: u8, operand: Operand) -> &mut Self {
        match operand {
            Operand::Reg(r) => self.emit(&[modrm(0b11, reg_field, r.code())]),
            Operand::Absolute(address) => {
                self.emit(&[modrm(0b00, reg_field, 0b101)]);
                self.emit(&address.to_le_bytes())
            }
            Operand::Indirect(r) => self.emit(&[modrm(0b00, reg_field, r.code())]),
            Operand::Disp8(r, disp) => self.emit(&[modrm(0b01, reg_field, r.code()), disp as u8]),
            Operand::Disp32(r, disp) => {
                self.emit(&[modrm(0b10, reg_field, r.code())]);
                self.emit(&disp.to_le_bytes())
            }
        }
    }

    /// `mov dst, imm32`
    pub fn mov_imm(&mut self, dst: Reg, value: u32) -> &mut Self {
        self.emit(&[0xB8 + dst.code()]);
        self.emit(&value.to_le_bytes())
    }

    /// `mov dst, src` where `src` is usually a memory operand.
    pub fn mov_load(&mut self, dst: Reg, src: Operand) -> &mut Self {
        self.emit(&[0x8B]);
        self.emit_operand(dst.code(), src)
    }

    /// `mov dst, src` between registers.
    pub fn mov_reg(&mut self, dst: Reg, src: Reg) -> &mut Self {
        self.mov_load(dst, Operand::Reg(src))
    }

    pub fn push(&mut self, reg: Reg) -> &mut Self {
        self.emit(&[0x50 + reg.code()])
    }

    pub fn pop(&mut self, reg: Reg) -> &mut Self {
        self.emit(&[0x58 + reg.code()])
    }

    /// `cmp lhs, rhs`
    pub fn cmp(&mut self, lhs: Reg, rhs: Reg) -> &mut Self {
        self.emit(&[0x39]);
        self.emit_operand(rhs.code(), Operand::Reg(lhs))
    }

    /// `call dword ptr [target]`
    pub fn call_indirect(&mut self, target: Operand) -> &mut Self {
        self.emit(&[0xFF]);
        self.emit_operand(2, target)
    }

    /// `jmp target` with a rel32 displacement computed from the origin.
    pub fn jmp(&mut self, target: u32) -> &mut Self {
        let next = self.position().wrapping_add(5);
        self.emit(&[0xE9]);
        self.emit(&target.wrapping_sub(next).to_le_bytes())
    }

    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Attach `label` to the current position.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        if let Some(slot) = self.labels.get_mut(label.0) {
            *slot = Some(self.code.len());
        }
        self
    }

    /// `je label` (always rel32).
    pub fn je(&mut self, label: Label) -> &mut Self {
        self.emit(&[0x0F, 0x84]);
        self.fixups.push((self.code.len(), label));
        self.emit(&[0; 4])
    }

    pub fn nop(&mut self) -> &mut Self {
        self.emit(&[0x90])
    }

    pub fn ret(&mut self) -> &mut Self {
        self.emit(&[0xC3])
    }

    /// Resolve label references and return the finished bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        for (field, label) in std::mem::take(&mut self.fixups) {
            let target = self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or_else(|| Error::StubAssembly(format!("label {} never bound", label.0)))?;
            let rel = target as i64 - (field as i64 + 4);
            let rel = i32::try_from(rel)
                .map_err(|_| Error::StubAssembly(format!("branch displacement {} too large", rel)))?;
            self.code[field..field + 4].copy_from_slice(&rel.to_le_bytes());
        }
        Ok(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_ui_dispatch_sequence() {
        let mut b = StubBuilder::new(0x0100_0000);
        b.mov_imm(Reg::Ecx, 0x1122_3344)
            .mov_imm(Reg::Esi, 0x5566_7788)
            .mov_load(Reg::Edx, Operand::Indirect(Reg::Ecx))
            .push(Reg::Esi)
            .call_indirect(Operand::Disp8(Reg::Edx, 0x38))
            .ret();

        assert_eq!(
            b.finish().unwrap(),
            vec![
                0xB9, 0x44, 0x33, 0x22, 0x11, // mov ecx, imm
                0xBE, 0x88, 0x77, 0x66, 0x55, // mov esi, imm
                0x8B, 0x11, // mov edx, [ecx]
                0x56, // push esi
                0xFF, 0x52, 0x38, // call [edx+38]
                0xC3,
            ]
        );
    }

    #[test]
    fn encodes_loads_and_compares() {
        let mut b = StubBuilder::new(0);
        b.mov_load(Reg::Ecx, Operand::Absolute(0x004C_67BC))
            .mov_load(Reg::Ecx, Operand::Disp32(Reg::Ecx, 0x10))
            .cmp(Reg::Ecx, Reg::Esi)
            .mov_reg(Reg::Ecx, Reg::Esi)
            .mov_load(Reg::Eax, Operand::Disp32(Reg::Esi, 0xCCC))
            .pop(Reg::Edi)
            .pop(Reg::Esi);

        assert_eq!(
            b.finish().unwrap(),
            vec![
                0x8B, 0x0D, 0xBC, 0x67, 0x4C, 0x00, // mov ecx, [004C67BC]
                0x8B, 0x89, 0x10, 0x00, 0x00, 0x00, // mov ecx, [ecx+10]
                0x39, 0xF1, // cmp ecx, esi
                0x8B, 0xCE, // mov ecx, esi
                0x8B, 0x86, 0xCC, 0x0C, 0x00, 0x00, // mov eax, [esi+CCC]
                0x5F, 0x5E,
            ]
        );
    }

    #[test]
    fn jmp_is_relative_to_next_instruction() {
        let mut b = StubBuilder::new(0x0100_0300);
        b.nop().jmp(0x0043_910A);
        let code = b.finish().unwrap();

        let rel = i32::from_le_bytes([code[2], code[3], code[4], code[5]]);
        assert_eq!(code[1], 0xE9);
        assert_eq!(0x0100_0306u32.wrapping_add_signed(rel), 0x0043_910A);
    }

    #[test]
    fn je_forward_label() {
        let mut b = StubBuilder::new(0);
        let skip = b.label();
        b.je(skip);
        b.mov_reg(Reg::Ecx, Reg::Esi).pop(Reg::Edi).pop(Reg::Esi).ret();
        b.bind(skip);
        b.nop();

        let code = b.finish().unwrap();
        assert_eq!(&code[..6], &[0x0F, 0x84, 0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn unbound_label_is_an_error() {
        let mut b = StubBuilder::new(0);
        let nowhere = b.label();
        b.je(nowhere);
        assert!(matches!(b.finish(), Err(Error::StubAssembly(_))));
    }
}
