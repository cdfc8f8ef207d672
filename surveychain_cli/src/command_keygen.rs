use surveychain::Address;

pub fn command_keygen() {
    let address = Address::random();

    println!("address: {}", address);
    println!("export SURVEYCHAIN_IDENTITY={}", address);
}
