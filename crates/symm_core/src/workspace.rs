//! Host and device buffers owned by one SYMM test case.

use std::fmt;

use tracing::debug;

use crate::{
    device::{AccessMode, DeviceContext},
    element::Element,
    error::{HarnessError, ResourceError},
    populate::{CreationFlags, Populator},
    problem::{Matrix, ProblemDescriptor},
};

/// Identifies one of the four host buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostSlot {
    A,
    B,
    C,
    BackupC,
}

impl fmt::Display for HostSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostSlot::A => "matrix A",
            HostSlot::B => "matrix B",
            HostSlot::C => "matrix C",
            HostSlot::BackupC => "backup of matrix C",
        };
        f.write_str(name)
    }
}

/// Contiguous host array of `ld * span + offset` elements.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer<T> {
    data: Vec<T>,
}

impl<T: Element> HostBuffer<T> {
    /// Fallible allocation: `None` when the length overflowed or the allocator refused.
    pub fn try_zeroed(len: Option<usize>) -> Option<Self> {
        let len = len?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, T::zero());
        Some(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

struct HostBuffers<T> {
    a: Option<HostBuffer<T>>,
    b: Option<HostBuffer<T>>,
    c: Option<HostBuffer<T>>,
    backup_c: Option<HostBuffer<T>>,
}

// Field order is release order: C first, A last.
struct DeviceBuffers<B> {
    c: Option<B>,
    b: Option<B>,
    a: Option<B>,
}

/// Owns every buffer of a test case; all of them are released exactly once on drop.
pub struct Workspace<T, B> {
    problem: ProblemDescriptor,
    ka: usize,
    kbc: usize,
    alpha: T,
    beta: T,
    device: DeviceBuffers<B>,
    host: HostBuffers<T>,
}

impl<T: Element, B> Workspace<T, B> {
    /// Allocates the host buffers. Allocation failure leaves a slot empty instead of aborting.
    pub fn new(problem: ProblemDescriptor) -> Self {
        let ka = problem.ka();
        let kbc = problem.kbc();
        let host = HostBuffers {
            a: HostBuffer::try_zeroed(problem.extent(Matrix::A)),
            b: HostBuffer::try_zeroed(problem.extent(Matrix::B)),
            c: HostBuffer::try_zeroed(problem.extent(Matrix::C)),
            backup_c: HostBuffer::try_zeroed(problem.extent(Matrix::C)),
        };
        Self {
            alpha: T::from_multiplier(problem.alpha),
            beta: T::from_multiplier(problem.beta),
            problem,
            ka,
            kbc,
            device: DeviceBuffers {
                c: None,
                b: None,
                a: None,
            },
            host,
        }
    }

    pub fn problem(&self) -> &ProblemDescriptor {
        &self.problem
    }

    pub fn ka(&self) -> usize {
        self.ka
    }

    pub fn kbc(&self) -> usize {
        self.kbc
    }

    pub fn alpha(&self) -> T {
        self.alpha
    }

    pub fn beta(&self) -> T {
        self.beta
    }

    /// First host buffer whose allocation failed, if any.
    pub fn missing_host_buffer(&self) -> Option<HostSlot> {
        [
            (HostSlot::A, self.host.a.is_none()),
            (HostSlot::B, self.host.b.is_none()),
            (HostSlot::C, self.host.c.is_none()),
            (HostSlot::BackupC, self.host.backup_c.is_none()),
        ]
        .into_iter()
        .find_map(|(slot, missing)| missing.then_some(slot))
    }

    pub fn host(&self, slot: HostSlot) -> Option<&HostBuffer<T>> {
        match slot {
            HostSlot::A => self.host.a.as_ref(),
            HostSlot::B => self.host.b.as_ref(),
            HostSlot::C => self.host.c.as_ref(),
            HostSlot::BackupC => self.host.backup_c.as_ref(),
        }
    }

    pub fn device(&self, matrix: Matrix) -> Option<&B> {
        match matrix {
            Matrix::A => self.device.a.as_ref(),
            Matrix::B => self.device.b.as_ref(),
            Matrix::C => self.device.c.as_ref(),
        }
    }

    /// Host operands for the reference path: A and B shared, live C mutable.
    pub fn reference_operands(&mut self) -> Result<(&[T], &[T], &mut [T]), ResourceError> {
        let a = self
            .host
            .a
            .as_ref()
            .ok_or(ResourceError::HostAllocation(HostSlot::A))?;
        let b = self
            .host
            .b
            .as_ref()
            .ok_or(ResourceError::HostAllocation(HostSlot::B))?;
        let c = self
            .host
            .c
            .as_mut()
            .ok_or(ResourceError::HostAllocation(HostSlot::C))?;
        Ok((a.as_slice(), b.as_slice(), c.as_mut_slice()))
    }

    /// Populates A, B and C, snapshots C into the backup and creates the device buffers.
    ///
    /// Device buffer creation is chained: B is only created after A succeeded and
    /// C only after B, so no partial device state is ever handed downstream.
    pub fn prepare<D>(&mut self, ctx: &D, populator: &mut Populator) -> Result<(), HarnessError>
    where
        D: DeviceContext<Buffer = B>,
    {
        let problem = &self.problem;
        let rect_flags = CreationFlags::rectangular(problem.order);
        let sym_flags = CreationFlags::symmetric(problem.order, problem.uplo);

        let a = self
            .host
            .a
            .as_mut()
            .ok_or(ResourceError::HostAllocation(HostSlot::A))?;
        let b = self
            .host
            .b
            .as_mut()
            .ok_or(ResourceError::HostAllocation(HostSlot::B))?;
        let c = self
            .host
            .c
            .as_mut()
            .ok_or(ResourceError::HostAllocation(HostSlot::C))?;
        let backup_c = self
            .host
            .backup_c
            .as_mut()
            .ok_or(ResourceError::HostAllocation(HostSlot::BackupC))?;

        populator.populate(
            &mut a.as_mut_slice()[problem.offa..],
            self.ka,
            self.ka,
            problem.lda,
            sym_flags,
        );
        populator.populate(
            &mut b.as_mut_slice()[problem.offb..],
            problem.m,
            problem.n,
            problem.ldb,
            rect_flags,
        );
        populator.populate(
            &mut c.as_mut_slice()[problem.offc..],
            problem.m,
            problem.n,
            problem.ldc,
            rect_flags,
        );
        backup_c.as_mut_slice().copy_from_slice(c.as_slice());
        debug!(seed = populator.seed(), "populated host operands");

        // Release anything left over from an earlier prepare before staging again.
        self.device = DeviceBuffers {
            c: None,
            b: None,
            a: None,
        };
        self.device.a = ctx.create_buffer("SymmA", a.as_bytes(), AccessMode::ReadOnly);
        if self.device.a.is_some() {
            self.device.b = ctx.create_buffer("SymmB", b.as_bytes(), AccessMode::ReadOnly);
        }
        if self.device.b.is_some() {
            self.device.c = ctx.create_buffer("SymmC", backup_c.as_bytes(), AccessMode::ReadWrite);
        }

        let missing = [
            (Matrix::A, self.device.a.is_none()),
            (Matrix::B, self.device.b.is_none()),
            (Matrix::C, self.device.c.is_none()),
        ]
        .into_iter()
        .find_map(|(matrix, missing)| missing.then_some(matrix));
        match missing {
            Some(matrix) => Err(ResourceError::DeviceBuffer(matrix).into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Order, Side, Uplo};

    #[test]
    fn allocates_padded_extents() {
        let mut problem = ProblemDescriptor::tight(Order::ColumnMajor, Side::Right, Uplo::Lower, 3, 5);
        problem.lda = 7;
        problem.offa = 2;
        problem.ldc = 4;
        problem.offc = 1;
        let workspace: Workspace<f32, ()> = Workspace::new(problem);
        assert_eq!(workspace.ka(), 5);
        assert_eq!(workspace.kbc(), 5);
        assert_eq!(workspace.host(HostSlot::A).map(HostBuffer::len), Some(7 * 5 + 2));
        assert_eq!(workspace.host(HostSlot::C).map(HostBuffer::len), Some(4 * 5 + 1));
        assert_eq!(workspace.host(HostSlot::BackupC).map(HostBuffer::len), Some(4 * 5 + 1));
        assert_eq!(workspace.missing_host_buffer(), None);
    }

    #[test]
    fn overflowing_extent_leaves_slot_empty() {
        let mut problem = ProblemDescriptor::tight(Order::ColumnMajor, Side::Left, Uplo::Upper, 4, 4);
        problem.ldb = usize::MAX / 2;
        let workspace: Workspace<f64, ()> = Workspace::new(problem);
        assert_eq!(workspace.missing_host_buffer(), Some(HostSlot::B));
        assert!(workspace.host(HostSlot::A).is_some());
    }

    #[test]
    fn host_buffer_bytes_cover_every_element() {
        let buffer: HostBuffer<crate::element::Complex64> =
            HostBuffer::try_zeroed(Some(3)).expect("tiny allocation");
        assert_eq!(buffer.as_bytes().len(), 3 * 16);
        assert!(buffer.as_bytes().iter().all(|&byte| byte == 0));
    }
}
