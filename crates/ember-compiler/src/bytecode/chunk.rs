//! Code of one compiled function.
//!
//! A [`BytecodeChunk`] is a flat byte buffer of opcodes and their big-endian
//! operands, plus a line table holding the source line of every byte. With
//! line numbers disabled the table is still written, filled with zeros, so
//! offsets into `code` and `lines` always agree.

use ember_core::LimitExceeded;

use super::OpCode;

/// Bytecode and line table of a single function.
///
/// Constants live in the unit's `ConstantPool`, not in the chunk.
#[derive(Debug, Clone, Default)]
pub struct BytecodeChunk {
    code: Vec<u8>,
    lines: Vec<u32>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write_byte(op.into(), line);
    }

    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_u16(&mut self, value: u16, line: u32) {
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(hi, line);
        self.write_byte(lo, line);
    }

    /// Write `op` with a placeholder distance and return the operand offset.
    pub fn write_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.write_op(op, line);
        let operand = self.code.len();
        self.write_u16(u16::MAX, line);
        operand
    }

    /// Point the jump whose operand sits at `operand` to the end of the chunk.
    ///
    /// The distance is counted from the byte after the operand.
    pub fn patch_jump(&mut self, operand: usize) -> Result<(), LimitExceeded> {
        let distance = self.code.len() - operand - 2;
        let distance = u16::try_from(distance)
            .map_err(|_| LimitExceeded::new("jump distance", u16::MAX as usize))?;
        self.code[operand..operand + 2].copy_from_slice(&distance.to_be_bytes());
        Ok(())
    }

    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    /// Source line of the instruction byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        match self.code.get(offset..offset + 2)? {
            &[hi, lo] => Some(u16::from_be_bytes([hi, lo])),
            _ => None,
        }
    }

    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.read_byte(offset).and_then(OpCode::from_u8)
    }

    /// The opcodes of the chunk in order, operands skipped.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let mut offset = 0;
        std::iter::from_fn(|| {
            let op = self.read_op(offset)?;
            offset += 1 + op.operand_size();
            Some(op)
        })
        .collect()
    }

    /// Assert the chunk consists of exactly `expected`, ignoring operands.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            names(expected),
            names(&actual),
        );
    }

    /// Assert `expected` occurs in the chunk as a subsequence.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut remaining = expected;
        for op in &actual {
            if remaining.first() == Some(op) {
                remaining = &remaining[1..];
            }
        }
        assert!(
            remaining.is_empty(),
            "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
            names(remaining),
            names(&actual),
        );
    }
}

fn names(ops: &[OpCode]) -> Vec<&'static str> {
    ops.iter().map(OpCode::name).collect()
}
