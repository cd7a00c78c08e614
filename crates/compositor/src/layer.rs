//! Raster layers and the ordered layer store.

use common::color::Color;
use common::error::{CompositorError, CompositorResult};
use common::geometry::PixelRect;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Unique identifier for a layer.
    pub struct LayerId;
}

/// A raster layer: a color plane and an alpha plane of canvas size.
///
/// Both planes always hold exactly `width * height` entries. They are only
/// exposed as fixed-length slices, so the length cannot drift.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Layer ID, assigned when the layer enters a [`LayerStore`].
    id: LayerId,
    /// Display name.
    name: String,
    width: u32,
    height: u32,
    color: Vec<Color>,
    alpha: Vec<u8>,
    /// Whether the layer takes part in compositing.
    visible: bool,
}

impl Layer {
    /// Create a fully transparent layer.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            id: LayerId::default(),
            name: String::new(),
            width,
            height,
            color: vec![Color::default(); len],
            alpha: vec![0; len],
            visible: true,
        }
    }

    /// Create a layer filled with a single color and alpha.
    pub fn filled(width: u32, height: u32, color: Color, alpha: u8) -> Self {
        let mut layer = Self::new(width, height);
        layer.color.fill(color);
        layer.alpha.fill(alpha);
        layer
    }

    /// Create a layer from existing planes.
    pub fn from_planes(
        width: u32,
        height: u32,
        color: Vec<Color>,
        alpha: Vec<u8>,
    ) -> CompositorResult<Self> {
        let expected = width as usize * height as usize;
        if color.len() != expected {
            return Err(CompositorError::PlaneLength {
                plane: "color",
                expected,
                actual: color.len(),
            });
        }
        if alpha.len() != expected {
            return Err(CompositorError::PlaneLength {
                plane: "alpha",
                expected,
                actual: alpha.len(),
            });
        }

        Ok(Self {
            id: LayerId::default(),
            name: String::new(),
            width,
            height,
            color,
            alpha,
            visible: true,
        })
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the initial visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// The color plane, row-major.
    pub fn color(&self) -> &[Color] {
        &self.color
    }

    /// The alpha plane, row-major.
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Get the color and alpha at a position.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(Color, u8)> {
        self.index(x, y).map(|i| (self.color[i], self.alpha[i]))
    }

    /// Fill a rectangle, clamped to the layer bounds.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Color, alpha: u8) {
        let Some(rect) = rect.clamp_to(self.width, self.height) else {
            return;
        };

        let stride = self.width as usize;
        for y in rect.y as usize..rect.bottom() as usize {
            let start = y * stride + rect.x as usize;
            let end = start + rect.width as usize;
            self.color[start..end].fill(color);
            self.alpha[start..end].fill(alpha);
        }
    }

    /// Resize both planes, keeping the overlapping top-left content.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        let mut resized = Layer::new(width, height);
        let copy_width = self.width.min(width) as usize;

        for y in 0..self.height.min(height) as usize {
            let src = y * self.width as usize;
            let dst = y * width as usize;
            resized.color[dst..dst + copy_width].copy_from_slice(&self.color[src..src + copy_width]);
            resized.alpha[dst..dst + copy_width].copy_from_slice(&self.alpha[src..src + copy_width]);
        }

        self.width = width;
        self.height = height;
        self.color = resized.color;
        self.alpha = resized.alpha;
    }
}

/// Ordered collection of layers. Paint order is storage order, last on top.
#[derive(Debug, Default)]
pub struct LayerStore {
    layers: SlotMap<LayerId, Layer>,
    order: Vec<LayerId>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self {
            layers: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Insert a layer on top of the stack.
    pub fn insert(&mut self, mut layer: Layer) -> LayerId {
        let id = self.layers.insert_with_key(|id| {
            layer.id = id;
            layer
        });
        self.order.push(id);
        id
    }

    /// Remove a layer.
    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let layer = self.layers.remove(id)?;
        self.order.retain(|&other| other != id);
        Some(layer)
    }

    /// Get a layer by ID.
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Get a mutable layer by ID.
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains_key(id)
    }

    /// Layer IDs in paint order (bottom first).
    pub fn ids(&self) -> &[LayerId] {
        &self.order
    }

    /// Layers in paint order (bottom first).
    pub fn paint_order(&self) -> impl Iterator<Item = &Layer> {
        self.order.iter().filter_map(|&id| self.layers.get(id))
    }

    /// Visible layers in paint order.
    pub fn visible(&self) -> impl Iterator<Item = &Layer> {
        self.paint_order().filter(|layer| layer.visible)
    }

    /// Resize every layer to new canvas dimensions.
    pub(crate) fn resize_all(&mut self, width: u32, height: u32) {
        for (_, layer) in self.layers.iter_mut() {
            layer.resize(width, height);
        }
    }

    /// Get number of layers.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if store is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
