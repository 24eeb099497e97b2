use crate::cpu::MemoryMapper;

pub const MEMORY_SIZE: usize = 0x10000;

/// 64K of plain external data memory.
pub struct Ram {
    ram: Box<[u8; MEMORY_SIZE]>,
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Ram {
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; MEMORY_SIZE]),
        }
    }

    pub fn clear(&mut self) {
        self.ram.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }
}

impl MemoryMapper for Ram {
    fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }
    fn write(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }
}

/// 64K of program memory. Writes from the CPU are ignored; the loader uses
/// [`Rom::load`].
pub struct Rom {
    rom: Box<[u8; MEMORY_SIZE]>,
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

impl Rom {
    pub fn new() -> Self {
        Self {
            rom: Box::new([0; MEMORY_SIZE]),
        }
    }

    pub fn clear(&mut self) {
        self.rom.fill(0);
    }

    /// Copy `bytes` in starting at `addr`, wrapping at the end of the space.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            self.rom[addr.wrapping_add(offset as u16) as usize] = *byte;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.rom[..]
    }
}

impl MemoryMapper for Rom {
    fn read(&self, addr: u16) -> u8 {
        self.rom[addr as usize]
    }
    fn write(&mut self, _: u16, _: u8) {
        // do nothing
    }
}
