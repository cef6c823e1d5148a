//! Arena Composer
//!
//! Computes the layout of several (size, alignment) component requests
//! inside one contiguous allocation, then owns that allocation and hands
//! out the per-component regions. Composition is pure arithmetic and can
//! run before anything is allocated; the only failure is a declared
//! alignment that is not a power of two, which is a caller bug.

use crate::error::{CoreError, CoreResult};

/// One component's placement requirements
#[derive(Debug, Clone, Copy)]
pub struct ComponentLayout {
    pub size: usize,
    pub align: usize,
}

impl ComponentLayout {
    /// A region of `count` f32 slots, aligned for a cache line
    ///
    /// Cache-line alignment is more than sufficient for SIMD loads over
    /// the floats.
    pub fn floats(count: usize) -> Self {
        Self {
            size: count * std::mem::size_of::<f32>(),
            align: 64,
        }
    }

    /// A plain byte region with no alignment demand
    pub fn bytes(count: usize) -> Self {
        Self {
            size: count,
            align: 1,
        }
    }
}

/// The computed placement of every component
#[derive(Debug, Clone)]
pub struct Composition {
    offsets: Vec<usize>,
    sizes: Vec<usize>,
    total_size: usize,
    max_align: usize,
}

impl Composition {
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn offset(&self, component: usize) -> usize {
        self.offsets[component]
    }

    pub fn size(&self, component: usize) -> usize {
        self.sizes[component]
    }

    pub fn component_count(&self) -> usize {
        self.offsets.len()
    }
}

/// Round `offset` up to the next multiple of `align`
///
/// `align` must be a power of two.
fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

/// Lay out `components` back to back, each at the next offset satisfying
/// its alignment.
pub fn compose(components: &[ComponentLayout]) -> CoreResult<Composition> {
    let mut offsets = Vec::with_capacity(components.len());
    let mut sizes = Vec::with_capacity(components.len());
    let mut cursor = 0usize;
    let mut max_align = 1usize;

    for component in components {
        if !component.align.is_power_of_two() {
            return Err(CoreError::NonPowerOfTwoAlign(component.align));
        }
        cursor = align_up(cursor, component.align);
        offsets.push(cursor);
        sizes.push(component.size);
        cursor += component.size;
        max_align = max_align.max(component.align);
    }

    Ok(Composition {
        offsets,
        sizes,
        total_size: cursor,
        max_align,
    })
}

/// One allocation holding every composed component
///
/// The backing storage is over-allocated by the largest alignment so the
/// base can be adjusted to satisfy it; every component offset is then
/// aligned by construction.
pub struct Arena {
    bytes: Box<[u8]>,
    base: usize,
    composition: Composition,
}

impl Arena {
    pub fn new(composition: Composition) -> Self {
        let slack = composition.max_align - 1;
        let bytes = vec![0u8; composition.total_size + slack].into_boxed_slice();
        let base = bytes.as_ptr().align_offset(composition.max_align);
        Self {
            bytes,
            base,
            composition,
        }
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Exclusive access to one component's region
    pub fn region_mut(&mut self, component: usize) -> &mut [u8] {
        let start = self.base + self.composition.offset(component);
        let len = self.composition.size(component);
        &mut self.bytes[start..start + len]
    }
}
