mod mock_exchange;
mod trading_loop;
