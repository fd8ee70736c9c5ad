pub mod coordinate_transformation;
