pub mod evidence;
pub mod intent;
pub mod text;
