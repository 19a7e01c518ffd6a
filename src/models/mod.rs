pub mod caremodel;
pub mod notificationmodel;
pub mod usermodel;
