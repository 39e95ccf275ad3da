#![allow(dead_code)]

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use i2c_xfer::{Ack, BusFault, BusPort, Direction, Transaction};

/// Wire-level event recorded by the stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    Stop,
    /// First byte after a START: 7-bit address plus direction bit.
    AddressByte(u8),
    WriteByte(u8),
    ReadByte,
    Bulk(Direction, usize),
}

/// Scripted bus port with a register-file slave behind it.
///
/// Models a single pointered device: the first `pointer_width` bytes
/// written after the wire address load the register pointer (MSB first),
/// further writes land at the pointer, reads come from it, and the
/// pointer auto-increments. A STOP ends the frame; a repeated START
/// keeps the pointer, which is what the read-after-write pattern relies
/// on.
pub struct StubPort {
    pub mem: [u8; 256],
    pub slave: u8,
    pub pointer_width: usize,
    /// Nack this many wire-address bytes before behaving again.
    pub nack_attempts: usize,
    /// Nack this many payload bytes (not stored) before behaving again.
    pub data_nacks: usize,
    /// Fail this many bulk transfers before succeeding.
    pub bulk_faults: usize,
    pub events: Vec<Event>,
    pointer: usize,
    pointer_bytes_seen: usize,
    frame_open: bool,
}

impl StubPort {
    pub fn new(slave: u8, pointer_width: usize) -> Self {
        Self {
            mem: [0; 256],
            slave,
            pointer_width,
            nack_attempts: 0,
            data_nacks: 0,
            bulk_faults: 0,
            events: Vec::new(),
            pointer: 0,
            pointer_bytes_seen: 0,
            frame_open: false,
        }
    }

    pub fn starts(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Start).count()
    }

    pub fn stops(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Stop).count()
    }

    fn store(&mut self, byte: u8) {
        self.mem[self.pointer % 256] = byte;
        self.pointer = (self.pointer + 1) % 256;
    }

    fn load(&mut self) -> u8 {
        let byte = self.mem[self.pointer % 256];
        self.pointer = (self.pointer + 1) % 256;
        byte
    }
}

impl BusPort for StubPort {
    async fn start(&mut self) {
        self.events.push(Event::Start);
        self.frame_open = false;
    }

    async fn stop(&mut self) {
        self.events.push(Event::Stop);
        self.frame_open = false;
        self.pointer_bytes_seen = 0;
    }

    async fn write_byte(&mut self, byte: u8) -> Ack {
        if !self.frame_open {
            self.frame_open = true;
            self.events.push(Event::AddressByte(byte));
            if self.nack_attempts > 0 {
                self.nack_attempts -= 1;
                return Ack::Nack;
            }
            if byte >> 1 != self.slave {
                return Ack::Nack;
            }
            return Ack::Ack;
        }
        self.events.push(Event::WriteByte(byte));
        if self.pointer_bytes_seen < self.pointer_width {
            if self.pointer_bytes_seen == 0 {
                self.pointer = 0;
            }
            self.pointer = ((self.pointer << 8) | byte as usize) % 256;
            self.pointer_bytes_seen += 1;
        } else {
            if self.data_nacks > 0 {
                self.data_nacks -= 1;
                return Ack::Nack;
            }
            self.store(byte);
        }
        Ack::Ack
    }

    async fn read_byte(&mut self, _ack: Ack) -> u8 {
        self.events.push(Event::ReadByte);
        self.load()
    }

    async fn transfer(
        &mut self,
        direction: Direction,
        buf: &mut [u8],
    ) -> Result<(), BusFault> {
        self.events.push(Event::Bulk(direction, buf.len()));
        if self.bulk_faults > 0 {
            self.bulk_faults -= 1;
            return Err(BusFault);
        }
        match direction {
            Direction::Read => {
                for byte in buf.iter_mut() {
                    *byte = self.load();
                }
            }
            Direction::Write => {
                for &byte in buf.iter() {
                    self.store(byte);
                }
            }
        }
        Ok(())
    }
}

pub type ReplyChannel = Channel<CriticalSectionRawMutex, Transaction, 8>;

/// Leak a reply channel so `DynamicSender<'static, _>` can point at it.
pub fn reply_channel() -> &'static ReplyChannel {
    Box::leak(Box::new(Channel::new()))
}
