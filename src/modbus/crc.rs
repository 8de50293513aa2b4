/// Modbus CRC-16 (initial value 0xFFFF, reflected polynomial 0xA001).
///
/// On the wire the result is appended low byte first, i.e. `crc.to_le_bytes()`.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    let poly: u16 = 0xA001;

    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ poly;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Checks the trailing two CRC bytes of a complete RTU frame.
///
/// Returns `(calculated, received)` on mismatch.
pub fn verify_frame_crc(frame: &[u8]) -> Result<(), (u16, u16)> {
    if frame.len() < 2 {
        return Err((crc16_modbus(frame), 0));
    }
    let data_len = frame.len() - 2;
    let received = u16::from_le_bytes([frame[data_len], frame[data_len + 1]]);
    let calculated = crc16_modbus(&frame[..data_len]);

    if received == calculated {
        Ok(())
    } else {
        Err((calculated, received))
    }
}
