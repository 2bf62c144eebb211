//! Browser host for windsway.
//!
//! The page decodes the sprite itself (e.g. through an offscreen canvas),
//! hands the RGBA bytes to [`SwayWorld`], forwards pointer events, and calls
//! [`SwayWorld::frame`] from `requestAnimationFrame`. After each frame the
//! rendered canvas is available either as an `ImageData` or as a pointer
//! into linear memory for a zero-copy `Uint8ClampedArray` view.

use glam::DVec2;
use wasm_bindgen::prelude::*;
use wasm_bindgen::Clamped;
use web_sys::ImageData;
use windsway_core::PixelBuffer;
use windsway_scene::{Frame, Rasterizer, SceneConfig, Simulation};

#[wasm_bindgen]
pub struct SwayWorld {
    sim: Simulation,
    rasterizer: Rasterizer,
    frame: Frame,
    bytes: Vec<u8>,
}

#[wasm_bindgen]
impl SwayWorld {
    /// `rgba` holds `width * height * 4` bytes. `config` is an optional
    /// scene configuration JSON string.
    #[wasm_bindgen(constructor)]
    pub fn new(
        rgba: &[u8],
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
        config: Option<String>,
    ) -> Result<SwayWorld, JsError> {
        let config = match config {
            Some(text) => SceneConfig::from_json_str(&text)?,
            None => SceneConfig::default(),
        };
        let pixels = PixelBuffer::from_rgba_bytes(width as usize, height as usize, rgba)?;
        let rasterizer = Rasterizer::new(config.render);
        let sim = Simulation::new(pixels, config, canvas_width as usize, canvas_height as usize)?;
        let mut world = SwayWorld {
            frame: rasterizer.render(&sim)?,
            sim,
            rasterizer,
            bytes: Vec::new(),
        };
        world.bytes = world.frame.to_rgba_bytes();
        Ok(world)
    }

    /// Swaps the sprite and restarts the loop.
    pub fn load_image(&mut self, rgba: &[u8], width: u32, height: u32) -> Result<(), JsError> {
        let pixels = PixelBuffer::from_rgba_bytes(width as usize, height as usize, rgba)?;
        self.sim.load_image(pixels)?;
        Ok(())
    }

    /// Feeds a pointer sample in canvas pixels. Returns whether it queued an impulse.
    pub fn pointer_move(&mut self, id: u32, x: f64, y: f64, pressure: f64) -> bool {
        self.sim.pointer_move(u64::from(id), DVec2::new(x, y), pressure)
    }

    pub fn pointer_release(&mut self, id: u32) -> bool {
        self.sim.pointer_release(u64::from(id))
    }

    pub fn resize(&mut self, canvas_width: u32, canvas_height: u32) {
        self.sim.resize(canvas_width as usize, canvas_height as usize);
    }

    pub fn start(&mut self) {
        self.sim.start();
    }

    pub fn stop(&mut self) {
        self.sim.stop();
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.sim.is_running()
    }

    /// Advances one tick for `now_ms` (as from `performance.now()`) and
    /// redraws. Returns `false` while stopped.
    pub fn frame(&mut self, now_ms: f64) -> Result<bool, JsError> {
        if !self.sim.frame(now_ms / 1000.0)? {
            return Ok(false);
        }
        self.rasterizer.render_into(&self.sim, &mut self.frame)?;
        self.bytes.clear();
        self.bytes.extend_from_slice(&self.frame.to_rgba_bytes());
        Ok(true)
    }

    /// Start of the last rendered frame in linear memory. Invalidated by the
    /// next `frame` call.
    pub fn frame_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    pub fn frame_len(&self) -> usize {
        self.bytes.len()
    }

    #[wasm_bindgen(getter)]
    pub fn frame_width(&self) -> u32 {
        self.frame.width() as u32
    }

    #[wasm_bindgen(getter)]
    pub fn frame_height(&self) -> u32 {
        self.frame.height() as u32
    }

    /// The last rendered frame, ready for `putImageData`.
    pub fn image_data(&self) -> Result<ImageData, JsValue> {
        ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&self.bytes),
            self.frame.width() as u32,
            self.frame.height() as u32,
        )
    }

    /// Current scene parameters as a JSON string.
    pub fn params(&self) -> String {
        self.sim.params().to_string()
    }

    /// Parameter schema as a JSON string.
    pub fn param_schema(&self) -> String {
        self.sim.param_schema().to_string()
    }
}
