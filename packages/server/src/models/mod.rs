pub mod fir;
