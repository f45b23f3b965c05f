mod common;
mod decorator;
mod transmissibility;
mod transmission;
