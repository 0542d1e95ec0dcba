/// Pixel layout of a buffer handed to a [`TextureSink`].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb8,
    Gray8,
}

/// Receiver for CPU buffers bound for the GPU.
///
/// The camera owns no rendering abstraction; the display layer implements
/// this for whatever texture type it draws with. `upload` is only called
/// when the corresponding view changed since the last upload.
pub trait TextureSink {
    fn upload(&mut self, format: TextureFormat, width: u32, height: u32, data: &[u8]);
}
