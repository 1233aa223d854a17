//! Instrumented in-memory device used by the lifecycle tests.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    thread,
    time::Duration,
};

use symm_core::{AccessMode, DeviceContext, DeviceStatus, Element, SymmLaunch};

#[derive(Default)]
pub struct CallLog {
    pub creates: Cell<usize>,
    pub released: RefCell<Vec<String>>,
    pub writes: RefCell<Vec<Vec<u8>>>,
    pub symm_calls: Cell<usize>,
    pub finishes: Cell<usize>,
    next_event: Cell<u64>,
}

impl CallLog {
    fn event(&self) -> u64 {
        let id = self.next_event.get();
        self.next_event.set(id + 1);
        id
    }
}

pub struct FakeBuffer {
    label: String,
    contents: RefCell<Vec<u8>>,
    log: Rc<CallLog>,
}

impl FakeBuffer {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn contents(&self) -> Vec<u8> {
        self.contents.borrow().clone()
    }
}

impl Drop for FakeBuffer {
    fn drop(&mut self) {
        self.log.released.borrow_mut().push(self.label.clone());
    }
}

pub struct FakeDevice {
    pub global_memory: u64,
    pub max_allocation: u64,
    pub double_precision: bool,
    /// Zero-based index of the `create_buffer` call that fails.
    pub fail_create_at: Option<usize>,
    pub fail_write: Option<DeviceStatus>,
    pub fail_symm: Option<DeviceStatus>,
    pub fail_wait: Option<DeviceStatus>,
    pub fail_flush: Option<DeviceStatus>,
    pub fail_completion: Option<DeviceStatus>,
    /// Zero-based index of the `finish` call that fails.
    pub fail_finish_at: Option<(usize, DeviceStatus)>,
    pub completion_delay: Duration,
    pub log: Rc<CallLog>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            global_memory: 1 << 30,
            max_allocation: 1 << 28,
            double_precision: true,
            fail_create_at: None,
            fail_write: None,
            fail_symm: None,
            fail_wait: None,
            fail_flush: None,
            fail_completion: None,
            fail_finish_at: None,
            completion_delay: Duration::ZERO,
            log: Rc::new(CallLog::default()),
        }
    }
}

impl DeviceContext for FakeDevice {
    type Buffer = FakeBuffer;
    type Event = u64;

    fn available_global_memory(&self) -> u64 {
        self.global_memory
    }

    fn max_single_allocation_size(&self) -> u64 {
        self.max_allocation
    }

    fn supports_double_precision(&self) -> bool {
        self.double_precision
    }

    fn queue_count(&self) -> usize {
        1
    }

    fn create_buffer(&self, label: &str, contents: &[u8], _access: AccessMode) -> Option<FakeBuffer> {
        let index = self.log.creates.get();
        self.log.creates.set(index + 1);
        if self.fail_create_at == Some(index) {
            return None;
        }
        Some(FakeBuffer {
            label: label.to_string(),
            contents: RefCell::new(contents.to_vec()),
            log: Rc::clone(&self.log),
        })
    }

    fn enqueue_write(&self, _queue: usize, buffer: &FakeBuffer, contents: &[u8]) -> Result<u64, DeviceStatus> {
        if let Some(status) = self.fail_write {
            return Err(status);
        }
        self.log.writes.borrow_mut().push(contents.to_vec());
        buffer.contents.borrow_mut().copy_from_slice(contents);
        Ok(self.log.event())
    }

    fn wait_for_event(&self, _event: &u64) -> Result<(), DeviceStatus> {
        self.fail_wait.map_or(Ok(()), Err)
    }

    fn enqueue_symm<T: Element>(&self, launch: &SymmLaunch<'_, T, FakeBuffer>) -> Result<u64, DeviceStatus> {
        if let Some(status) = self.fail_symm {
            return Err(status);
        }
        self.log.symm_calls.set(self.log.symm_calls.get() + 1);
        // Clobber C so a missing re-stage would be visible.
        launch.c.contents.borrow_mut().fill(0xA5);
        Ok(self.log.event())
    }

    fn flush(&self, _queue: usize) -> Result<(), DeviceStatus> {
        self.fail_flush.map_or(Ok(()), Err)
    }

    fn finish(&self, _queue: usize) -> Result<(), DeviceStatus> {
        let index = self.log.finishes.get();
        self.log.finishes.set(index + 1);
        match self.fail_finish_at {
            Some((at, status)) if at == index => Err(status),
            _ => Ok(()),
        }
    }

    fn wait_for_completion(&self, _queue: usize, _event: &u64) -> Result<(), DeviceStatus> {
        if let Some(status) = self.fail_completion {
            return Err(status);
        }
        if !self.completion_delay.is_zero() {
            thread::sleep(self.completion_delay);
        }
        Ok(())
    }
}
