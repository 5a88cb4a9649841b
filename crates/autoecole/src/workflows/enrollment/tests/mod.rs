mod common;
mod progression;
mod routing;
