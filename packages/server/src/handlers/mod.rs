pub mod fir;
pub mod health;
