pub mod caredtos;
pub mod userdtos;
