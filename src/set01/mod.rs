pub mod c07;
pub mod c08;
