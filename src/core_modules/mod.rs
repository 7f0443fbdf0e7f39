pub mod buffer_preparer;
pub mod compositor;
pub mod edge_blender;
pub mod edge_map;
pub mod exclusion;
pub mod lighting;
pub mod mask_provider;
pub mod mask_refiner;
pub mod paint_color;
pub mod pixel;
pub mod raster;
pub mod region_grower;
pub mod surface;
