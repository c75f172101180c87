use bitflags::bitflags;

bitflags! {
    /// Button mask for a standard NES controller.
    ///
    /// Bit order matches the serial read-out of the hardware shift
    /// register, MSB first: A, B, Select, Start, Up, Down, Left, Right.
    pub struct ControllerButtons: u8 {
        const A = 0b1000_0000;
        const B = 0b0100_0000;
        const SELECT = 0b0010_0000;
        const START = 0b0001_0000;
        const UP = 0b0000_1000;
        const DOWN = 0b0000_0100;
        const LEFT = 0b0000_0010;
        const RIGHT = 0b0000_0001;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_bit_order() {
        assert_eq!(ControllerButtons::A.bits(), 0x80);
        assert_eq!(ControllerButtons::RIGHT.bits(), 0x01);
        assert_eq!(
            (ControllerButtons::START | ControllerButtons::UP).bits(),
            0b0001_1000
        );
    }
}
