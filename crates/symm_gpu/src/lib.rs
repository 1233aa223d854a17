//! `wgpu` implementation of the SYMM harness device context.

use std::{borrow::Cow, cell::RefCell, collections::HashMap, env, mem::size_of};

use anyhow::{Context, Result};
use bytemuck::{bytes_of, cast_slice};
use pollster::block_on;
use symm_core::{
    AccessMode, DeviceContext, DeviceStatus, Element, ElementKind, Order, Side, SymmLaunch, Uplo,
};
use symm_shaders::{compute, symm_source, Precision};
use tracing::{debug, info, warn};
use wgpu::{
    util::DeviceExt, AdapterInfo, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingType, BufferBindingType, BufferUsages, ComputePipeline, Device, DeviceDescriptor,
    ErrorFilter, Features, Instance, Limits, PipelineLayout, PollType, PowerPreference, Queue,
    RequestAdapterOptions, ShaderStages, SubmissionIndex,
};

/// Environment override for the global memory figure wgpu cannot report.
pub const GLOBAL_MEM_ENV: &str = "SYMM_PERF_GLOBAL_MEM_BYTES";
const FALLBACK_GLOBAL_MEMORY: u64 = 4 << 30;
const MIN_BUFFER_SIZE: u64 = 16;
const HEADER_WORDS: usize = 12;

#[derive(Debug, Clone, Default)]
pub struct GpuOptions {
    /// Takes precedence over [`GLOBAL_MEM_ENV`].
    pub global_memory_bytes: Option<u64>,
    pub force_fallback_adapter: bool,
    pub low_power: bool,
}

pub struct GpuContext {
    adapter_info: AdapterInfo,
    device: Device,
    queue: Queue,
    global_memory: u64,
    max_allocation: u64,
    max_workgroups: u32,
    bind_group_layout: BindGroupLayout,
    pipeline_layout: PipelineLayout,
    pipelines: RefCell<HashMap<ElementKind, ComputePipeline>>,
}

/// Device buffer; destroyed when dropped.
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
    len: u64,
}

impl GpuBuffer {
    /// Logical byte length, before padding.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

/// Headless adapter and device. `SHADER_F64` is requested whenever the adapter has it.
pub async fn init(options: &GpuOptions) -> Result<GpuContext> {
    let instance = Instance::default();
    let adapter = instance
        .request_adapter(&RequestAdapterOptions {
            power_preference: if options.low_power {
                PowerPreference::LowPower
            } else {
                PowerPreference::HighPerformance
            },
            compatible_surface: None,
            force_fallback_adapter: options.force_fallback_adapter,
        })
        .await
        .context("no compatible GPU adapter found")?;

    let adapter_info = adapter.get_info();
    let required_features = adapter.features() & Features::SHADER_F64;
    let adapter_limits = adapter.limits();
    let required_limits = Limits {
        max_buffer_size: adapter_limits.max_buffer_size,
        max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
        ..Limits::default()
    };

    let device_desc = DeviceDescriptor {
        label: Some("SymmPerf Device"),
        required_features,
        required_limits,
        ..Default::default()
    };
    let (device, queue) = adapter
        .request_device(&device_desc)
        .await
        .context("failed to request wgpu device")?;

    let limits = device.limits();
    let max_allocation = limits
        .max_buffer_size
        .min(u64::from(limits.max_storage_buffer_binding_size));
    let global_memory = options
        .global_memory_bytes
        .or_else(global_memory_from_env)
        .unwrap_or(FALLBACK_GLOBAL_MEMORY);

    let bind_group_layout = create_bind_group_layout(&device);
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("SymmPipelineLayout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        shader_f64 = device.features().contains(Features::SHADER_F64),
        max_allocation,
        global_memory,
        "initialized wgpu device"
    );

    Ok(GpuContext {
        adapter_info,
        device,
        queue,
        global_memory,
        max_allocation,
        max_workgroups: limits.max_compute_workgroups_per_dimension,
        bind_group_layout,
        pipeline_layout,
        pipelines: RefCell::new(HashMap::new()),
    })
}

fn global_memory_from_env() -> Option<u64> {
    let raw = env::var(GLOBAL_MEM_ENV).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(bytes) if bytes > 0 => Some(bytes),
        _ => {
            warn!(value = %raw, "ignoring unparsable {GLOBAL_MEM_ENV}");
            None
        }
    }
}

fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
    let buffer_entry = |binding, ty: BufferBindingType| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("SymmBindGroupLayout"),
        entries: &[
            buffer_entry(0, BufferBindingType::Storage { read_only: true }),
            buffer_entry(1, BufferBindingType::Storage { read_only: true }),
            buffer_entry(2, BufferBindingType::Storage { read_only: false }),
            buffer_entry(3, BufferBindingType::Uniform),
        ],
    })
}

/// Rounds up to the copy alignment, never below [`MIN_BUFFER_SIZE`].
fn padded_size(len: usize) -> u64 {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    let len = (len as u64).max(MIN_BUFFER_SIZE);
    len.div_ceil(align) * align
}

/// Device-local storage buffer, filled through the queue rather than a mapping.
fn buffer_descriptor(label: &str, size: u64, access: AccessMode) -> wgpu::BufferDescriptor<'_> {
    let usage = match access {
        AccessMode::ReadOnly => BufferUsages::STORAGE | BufferUsages::COPY_DST,
        AccessMode::ReadWrite => BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
    };
    wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    }
}

/// `write_buffer` needs a length that is a multiple of the copy alignment.
fn aligned_contents(contents: &[u8]) -> Cow<'_, [u8]> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    if contents.len() % align == 0 {
        Cow::Borrowed(contents)
    } else {
        let mut padded = contents.to_vec();
        padded.resize(contents.len().div_ceil(align) * align, 0);
        Cow::Owned(padded)
    }
}

fn shader_variant(kind: ElementKind) -> (Precision, bool) {
    match kind {
        ElementKind::Single => (Precision::F32, false),
        ElementKind::Double => (Precision::F64, false),
        ElementKind::SingleComplex => (Precision::F32, true),
        ElementKind::DoubleComplex => (Precision::F64, true),
    }
}

fn status_of(err: &wgpu::Error) -> DeviceStatus {
    match err {
        wgpu::Error::OutOfMemory { .. } => DeviceStatus::OUT_OF_MEMORY,
        wgpu::Error::Validation { .. } => DeviceStatus::VALIDATION,
        wgpu::Error::Internal { .. } => DeviceStatus::INTERNAL,
    }
}

fn status_of_poll(err: wgpu::PollError) -> DeviceStatus {
    match err {
        wgpu::PollError::Timeout => DeviceStatus::TIMEOUT,
    }
}

/// Uniform block matching `Params` in the SYMM kernel: twelve `u32` words, then alpha and beta.
pub fn encode_params<T: Element, B>(launch: &SymmLaunch<'_, T, B>) -> Option<Vec<u8>> {
    let word = |value: usize| u32::try_from(value).ok();
    let header: [u32; HEADER_WORDS] = [
        u32::from(launch.order == Order::RowMajor),
        u32::from(launch.side == Side::Right),
        u32::from(launch.uplo == Uplo::Lower),
        word(launch.m)?,
        word(launch.n)?,
        word(launch.offa)?,
        word(launch.lda)?,
        word(launch.offb)?,
        word(launch.ldb)?,
        word(launch.offc)?,
        word(launch.ldc)?,
        0,
    ];
    let mut bytes = Vec::with_capacity(HEADER_WORDS * 4 + 2 * size_of::<T>() + 16);
    bytes.extend_from_slice(cast_slice(&header));
    bytes.extend_from_slice(bytes_of(&launch.alpha));
    bytes.extend_from_slice(bytes_of(&launch.beta));
    bytes.resize(bytes.len().div_ceil(16) * 16, 0);
    Some(bytes)
}

impl GpuContext {
    pub fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }

    fn check_queue(&self, queue: usize) -> Result<(), DeviceStatus> {
        if queue < self.queue_count() {
            Ok(())
        } else {
            Err(DeviceStatus::INVALID_VALUE)
        }
    }

    /// Runs `f` inside validation and out-of-memory error scopes.
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> Result<R, DeviceStatus> {
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        self.device.push_error_scope(ErrorFilter::Validation);
        let result = f();
        let validation = block_on(self.device.pop_error_scope());
        let oom = block_on(self.device.pop_error_scope());
        match validation.or(oom) {
            Some(err) => {
                debug!("wgpu error: {err}");
                Err(status_of(&err))
            }
            None => Ok(result),
        }
    }

    fn pipeline(&self, kind: ElementKind) -> Result<ComputePipeline, DeviceStatus> {
        if let Some(pipeline) = self.pipelines.borrow().get(&kind) {
            return Ok(pipeline.clone());
        }
        if kind.is_double() && !self.supports_double_precision() {
            return Err(DeviceStatus::UNSUPPORTED);
        }

        let (precision, complex) = shader_variant(kind);
        let source = symm_source(precision, complex);
        let pipeline = self.scoped(|| {
            let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kind.routine()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            self.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kind.routine()),
                    layout: Some(&self.pipeline_layout),
                    module: &module,
                    entry_point: Some(compute::SYMM_ENTRY_POINT),
                    compilation_options: Default::default(),
                    cache: None,
                })
        })?;
        debug!(routine = kind.routine(), "compiled SYMM pipeline");
        self.pipelines.borrow_mut().insert(kind, pipeline.clone());
        Ok(pipeline)
    }

    fn wait_for(&self, index: SubmissionIndex) -> Result<(), DeviceStatus> {
        self.device
            .poll(PollType::WaitForSubmissionIndex(index))
            .map(|_| ())
            .map_err(status_of_poll)
    }
}

impl DeviceContext for GpuContext {
    type Buffer = GpuBuffer;
    type Event = SubmissionIndex;

    fn available_global_memory(&self) -> u64 {
        self.global_memory
    }

    fn max_single_allocation_size(&self) -> u64 {
        self.max_allocation
    }

    fn supports_double_precision(&self) -> bool {
        self.device.features().contains(Features::SHADER_F64)
    }

    fn queue_count(&self) -> usize {
        1
    }

    fn create_buffer(&self, label: &str, contents: &[u8], access: AccessMode) -> Option<GpuBuffer> {
        let size = padded_size(contents.len());
        if size > self.max_allocation {
            warn!(label, size, limit = self.max_allocation, "buffer exceeds allocation limit");
            return None;
        }
        let created = self.scoped(|| {
            let buffer = self.device.create_buffer(&buffer_descriptor(label, size, access));
            self.queue.write_buffer(&buffer, 0, &aligned_contents(contents));
            buffer
        });
        match created {
            Ok(buffer) => Some(GpuBuffer {
                buffer,
                len: contents.len() as u64,
            }),
            Err(status) => {
                warn!(label, size, %status, "buffer creation failed");
                None
            }
        }
    }

    fn enqueue_write(
        &self,
        queue: usize,
        buffer: &GpuBuffer,
        contents: &[u8],
    ) -> Result<SubmissionIndex, DeviceStatus> {
        self.check_queue(queue)?;
        let len = contents.len() as u64;
        if len > buffer.len || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(DeviceStatus::INVALID_VALUE);
        }
        self.scoped(|| {
            self.queue.write_buffer(&buffer.buffer, 0, contents);
            self.queue.submit(std::iter::empty())
        })
    }

    fn wait_for_event(&self, event: &SubmissionIndex) -> Result<(), DeviceStatus> {
        self.wait_for(event.clone())
    }

    fn enqueue_symm<T: Element>(
        &self,
        launch: &SymmLaunch<'_, T, GpuBuffer>,
    ) -> Result<SubmissionIndex, DeviceStatus> {
        self.check_queue(launch.queue)?;
        let params = encode_params(launch).ok_or(DeviceStatus::INVALID_VALUE)?;
        let (wg_x, wg_y) = compute::WORKGROUP_SIZE;
        let groups_x = u32::try_from(launch.m.div_ceil(wg_x as usize))
            .map_err(|_| DeviceStatus::INVALID_VALUE)?;
        let groups_y = u32::try_from(launch.n.div_ceil(wg_y as usize))
            .map_err(|_| DeviceStatus::INVALID_VALUE)?;
        if groups_x > self.max_workgroups || groups_y > self.max_workgroups {
            return Err(DeviceStatus::INVALID_VALUE);
        }
        let pipeline = self.pipeline(T::KIND)?;

        self.scoped(|| {
            let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("SymmParams"),
                contents: &params,
                usage: BufferUsages::UNIFORM,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("SymmBindGroup"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: launch.a.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: launch.b.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: launch.c.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("SymmEncoder"),
                });
            if groups_x > 0 && groups_y > 0 {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(T::KIND.routine()),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(groups_x, groups_y, 1);
            }
            self.queue.submit(Some(encoder.finish()))
        })
    }

    fn flush(&self, queue: usize) -> Result<(), DeviceStatus> {
        self.check_queue(queue)?;
        self.device
            .poll(PollType::Poll)
            .map(|_| ())
            .map_err(status_of_poll)
    }

    fn finish(&self, queue: usize) -> Result<(), DeviceStatus> {
        self.check_queue(queue)?;
        self.device
            .poll(PollType::Wait)
            .map(|_| ())
            .map_err(status_of_poll)
    }

    fn wait_for_completion(&self, queue: usize, event: &SubmissionIndex) -> Result<(), DeviceStatus> {
        self.check_queue(queue)?;
        self.wait_for(event.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_padded_to_copy_alignment() {
        assert_eq!(padded_size(0), 16);
        assert_eq!(padded_size(12), 16);
        assert_eq!(padded_size(17), 20);
        assert_eq!(padded_size(64), 64);
    }

    #[test]
    fn buffers_are_created_unmapped_and_writable() {
        for access in [AccessMode::ReadOnly, AccessMode::ReadWrite] {
            let desc = buffer_descriptor("SymmA", 64, access);
            assert!(!desc.mapped_at_creation);
            assert!(desc.usage.contains(BufferUsages::STORAGE | BufferUsages::COPY_DST));
            assert_eq!(desc.size, 64);
        }
        assert!(buffer_descriptor("SymmC", 64, AccessMode::ReadWrite)
            .usage
            .contains(BufferUsages::COPY_SRC));
    }

    #[test]
    fn initial_contents_are_padded_for_queue_writes() {
        let aligned = [1u8; 8];
        assert!(matches!(aligned_contents(&aligned), Cow::Borrowed(_)));
        let ragged = aligned_contents(&[7u8; 5]);
        assert_eq!(ragged.as_ref(), &[7, 7, 7, 7, 7, 0, 0, 0]);
        assert_eq!(aligned_contents(&[]).len(), 0);
    }

    #[test]
    fn poll_timeout_reports_timeout_status() {
        assert_eq!(status_of_poll(wgpu::PollError::Timeout), DeviceStatus::TIMEOUT);
    }

    #[test]
    fn every_kind_maps_to_a_shader_variant() {
        assert_eq!(shader_variant(ElementKind::Single), (Precision::F32, false));
        assert_eq!(shader_variant(ElementKind::DoubleComplex), (Precision::F64, true));
    }
}
