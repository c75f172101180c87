use std::cell::RefCell;
use std::rc::Rc;

use crate::cartridge::Cartridge;
use crate::dma::DmaController;
use crate::graphics::ppu::Ppu;
use crate::interfaces::CpuBus;
use crate::processor::bus::Bus;

pub type SharedBus = Rc<RefCell<Bus>>;
pub type SharedCpuBus = Rc<RefCell<dyn CpuBus>>;
pub type SharedPpu = Rc<RefCell<Ppu>>;
pub type SharedDma = Rc<RefCell<DmaController>>;
pub type SharedCartridge = Rc<RefCell<Cartridge>>;
