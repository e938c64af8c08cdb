fn main() -> anyhow::Result<()> {
    cafe_pos_client_lib::run()
}
