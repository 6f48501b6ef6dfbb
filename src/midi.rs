// MIDI output: message encoding plus the sink trait the scanner talks to.

use crate::serial::{push_all, ByteSink};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;

/// MIDI channel, stored zero-based (wire nibble).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel(u8);

impl Channel {
    /// From the 1-based number musicians use (1-16). Out-of-range numbers wrap into the nibble.
    pub const fn from_number(n: u8) -> Self {
        Channel(n.wrapping_sub(1) & 0x0F)
    }

    pub const fn number(self) -> u8 {
        self.0 + 1
    }

    pub const fn nibble(self) -> u8 {
        self.0
    }
}

/// GM percussion lives on channel 10.
pub const PERCUSSION: Channel = Channel::from_number(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: Channel, note: u8, velocity: u8 },
    NoteOff { channel: Channel, note: u8, velocity: u8 },
}

impl MidiMessage {
    /// Three-byte wire form (DIN / serial).
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                [NOTE_ON | channel.nibble(), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note, velocity } => {
                [NOTE_OFF | channel.nibble(), note & 0x7F, velocity & 0x7F]
            }
        }
    }

    /// USB-MIDI event packet: cable number in the high nibble, code index = status high nibble.
    pub fn usb_packet(&self, cable: u8) -> [u8; 4] {
        let [status, data1, data2] = self.to_bytes();
        [(cable & 0x0F) << 4 | status >> 4, status, data1, data2]
    }
}

/// Anything that can put a note message on the wire.
pub trait MidiSink {
    type Error;

    fn send(&mut self, message: MidiMessage) -> Result<(), Self::Error>;

    fn note_on(&mut self, note: u8, velocity: u8, channel: Channel) -> Result<(), Self::Error> {
        self.send(MidiMessage::NoteOn { channel, note, velocity })
    }

    fn note_off(&mut self, note: u8, velocity: u8, channel: Channel) -> Result<(), Self::Error> {
        self.send(MidiMessage::NoteOff { channel, note, velocity })
    }
}

/// MIDI over a UART (31250 baud DIN, or a serial-to-MIDI bridge on the host).
pub struct SerialMidi<T: ByteSink> {
    port: T,
}

impl<T: ByteSink> SerialMidi<T> {
    pub fn new(port: T) -> Self {
        Self { port }
    }

    pub fn release(self) -> T {
        self.port
    }
}

impl<T: ByteSink> MidiSink for SerialMidi<T> {
    type Error = T::Error;

    fn send(&mut self, message: MidiMessage) -> Result<(), T::Error> {
        push_all(&mut self.port, &message.to_bytes())?;
        self.port.drain();
        Ok(())
    }
}

/// USB-MIDI event packets on a byte link, for a USB bridge chip that forwards them to the host
/// unchanged. `cable` is the virtual cable the host sees.
pub struct UsbPacketMidi<T: ByteSink> {
    link: T,
    cable: u8,
}

impl<T: ByteSink> UsbPacketMidi<T> {
    pub fn new(link: T, cable: u8) -> Self {
        Self { link, cable }
    }

    pub fn release(self) -> T {
        self.link
    }
}

impl<T: ByteSink> MidiSink for UsbPacketMidi<T> {
    type Error = T::Error;

    fn send(&mut self, message: MidiMessage) -> Result<(), T::Error> {
        push_all(&mut self.link, &message.usb_packet(self.cable))?;
        self.link.drain();
        Ok(())
    }
}
