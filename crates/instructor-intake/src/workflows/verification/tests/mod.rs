mod common;
mod navigation;
mod routing;
