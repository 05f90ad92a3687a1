use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    flames::cli::main()
}
